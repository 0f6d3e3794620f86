use inquire::Confirm;

use crate::errors::NeedsbookError;

/// Asks the user whether a destructive action may go ahead.
pub trait Confirmation {
    fn confirm(&mut self, question: &str) -> Result<bool, NeedsbookError>;
}

/// Interactive yes/no prompt on the terminal, defaulting to "no".
#[derive(Debug, Default)]
pub struct PromptConfirmation;

impl Confirmation for PromptConfirmation {
    fn confirm(&mut self, question: &str) -> Result<bool, NeedsbookError> {
        Ok(Confirm::new(question).with_default(false).prompt()?)
    }
}

/// Used for `--yes`.
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Confirmation for AssumeYes {
    fn confirm(&mut self, _question: &str) -> Result<bool, NeedsbookError> {
        Ok(true)
    }
}

/// Answers from a fixed list, for tests.
#[cfg(test)]
#[derive(Debug)]
pub struct Scripted {
    answers: std::collections::VecDeque<bool>,
    asked: usize,
}

#[cfg(test)]
impl Scripted {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: 0,
        }
    }

    pub fn asked(&self) -> usize {
        self.asked
    }
}

#[cfg(test)]
impl Confirmation for Scripted {
    fn confirm(&mut self, question: &str) -> Result<bool, NeedsbookError> {
        self.asked += 1;
        self.answers
            .pop_front()
            .ok_or_else(|| NeedsbookError::InvalidArgument(format!("unexpected question: {question}")))
    }
}
