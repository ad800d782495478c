//! Interactive yes/no prompt on the terminal

use std::io::{BufRead, Write};

use crate::domain::entities::ModuleId;
use crate::domain::traits::ModulePrompt;

/// Asks on stdout and reads the answer from stdin. EOF counts as "no".
pub struct StdinPrompt;

impl StdinPrompt {
    fn parse_answer(line: &str) -> Option<bool> {
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(true),
            "n" | "no" => Some(false),
            _ => None,
        }
    }
}

impl ModulePrompt for StdinPrompt {
    fn confirm(&self, id: &ModuleId) -> bool {
        let stdin = std::io::stdin();
        loop {
            print!("New module found: {}. Enable it? (yes/no) > ", id);
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {
                    if let Some(answer) = Self::parse_answer(&line) {
                        return answer;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(StdinPrompt::parse_answer("Yes\n"), Some(true));
        assert_eq!(StdinPrompt::parse_answer(" n "), Some(false));
        assert_eq!(StdinPrompt::parse_answer("maybe"), None);
    }
}
