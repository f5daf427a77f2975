//! The human in the loop: confirmations and acknowledgments.

use console::Term;
use parking_lot::Mutex;

/// Answers yes/no prompts and acknowledges failures.
pub trait Operator: Send + Sync {
    /// Ask a yes/no question. `true` means go ahead.
    fn confirm(&self, prompt: &str) -> bool;

    /// Show a message and wait until the operator has seen it.
    fn acknowledge(&self, message: &str);
}

/// Operator at the terminal, prompted on stderr.
#[derive(Debug, Clone)]
pub struct ConsoleOperator {
    term: Term,
}

impl ConsoleOperator {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for ConsoleOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl Operator for ConsoleOperator {
    fn confirm(&self, prompt: &str) -> bool {
        if self.term.write_str(&format!("{prompt} [y/N] ")).is_err() {
            return false;
        }
        match self.term.read_line() {
            Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }

    fn acknowledge(&self, message: &str) {
        let _ = self.term.write_line(message);
        let _ = self.term.write_str("Press Enter to continue...");
        let _ = self.term.read_line();
    }
}

/// Scripted operator that never blocks.
#[derive(Debug, Default)]
pub struct AutoOperator {
    answer: bool,
    prompts: Mutex<Vec<String>>,
    acknowledged: Mutex<Vec<String>>,
}

impl AutoOperator {
    /// Confirms every prompt.
    pub fn yes() -> Self {
        Self {
            answer: true,
            ..Default::default()
        }
    }

    /// Declines every prompt.
    pub fn no() -> Self {
        Self::default()
    }

    /// Prompts seen so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Messages acknowledged so far.
    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().clone()
    }
}

impl Operator for AutoOperator {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().push(prompt.to_string());
        self.answer
    }

    fn acknowledge(&self, message: &str) {
        self.acknowledged.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_operator_records_prompts() {
        let operator = AutoOperator::no();
        assert!(!operator.confirm("Delete collection 'faq'?"));
        operator.acknowledge("build aborted");

        assert_eq!(operator.prompts(), ["Delete collection 'faq'?"]);
        assert_eq!(operator.acknowledged(), ["build aborted"]);
        assert!(AutoOperator::yes().confirm("again?"));
    }
}
