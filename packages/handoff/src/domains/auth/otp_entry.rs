//! Six-cell code entry buffer.
//!
//! Mirrors a row of single-character inputs: typing advances focus,
//! backspace on an empty cell steps back, and pasting fills from the left.
//! A completed buffer yields its code exactly once until [`OtpEntryController::reset`].

use super::models::{OtpCode, OTP_LENGTH};

/// What an input event produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryEvent {
    /// Input rejected, buffer unchanged
    Rejected,
    /// Buffer changed but no completion fired
    Updated,
    /// Buffer just became complete; verify this code
    Completed(OtpCode),
}

#[derive(Debug, Clone)]
pub struct OtpEntryController {
    cells: [Option<char>; OTP_LENGTH],
    focus: usize,
    error: Option<String>,
    armed: bool,
}

impl Default for OtpEntryController {
    fn default() -> Self {
        Self::new()
    }
}

impl OtpEntryController {
    pub fn new() -> Self {
        Self {
            cells: [None; OTP_LENGTH],
            focus: 0,
            error: None,
            armed: true,
        }
    }

    /// Handle a change of cell `index` to `input`.
    ///
    /// Input containing anything but ASCII digits is ignored. Otherwise the
    /// last character wins (empty input clears the cell).
    pub fn set_digit(&mut self, index: usize, input: &str) -> EntryEvent {
        if index >= OTP_LENGTH || !input.chars().all(|c| c.is_ascii_digit()) {
            return EntryEvent::Rejected;
        }

        let digit = input.chars().last();
        self.cells[index] = digit;
        self.error = None;

        if digit.is_some() && index < OTP_LENGTH - 1 {
            self.focus = index + 1;
        }

        self.check_completion()
    }

    /// Backspace on an empty cell moves focus back without deleting.
    pub fn backspace(&mut self, index: usize) {
        if index < OTP_LENGTH && self.cells[index].is_none() && index > 0 {
            self.focus = index - 1;
        }
    }

    /// Fill cells from the left with the first six digits of `text`.
    pub fn paste_bulk(&mut self, text: &str) -> EntryEvent {
        let digits: Vec<char> = text
            .chars()
            .filter(|c| c.is_ascii_digit())
            .take(OTP_LENGTH)
            .collect();
        if digits.is_empty() {
            return EntryEvent::Rejected;
        }

        for (cell, digit) in self.cells.iter_mut().zip(&digits) {
            *cell = Some(*digit);
        }
        self.focus = digits.len().min(OTP_LENGTH - 1);
        self.error = None;

        self.check_completion()
    }

    fn check_completion(&mut self) -> EntryEvent {
        if !self.armed {
            return EntryEvent::Updated;
        }
        match OtpCode::from_cells(&self.cells) {
            Some(code) => {
                self.armed = false;
                EntryEvent::Completed(code)
            }
            None => EntryEvent::Updated,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Clear every cell, focus the first, and allow completion again.
    pub fn reset(&mut self) {
        self.cells = [None; OTP_LENGTH];
        self.focus = 0;
        self.armed = true;
    }

    /// Cell contents as strings (`""` for empty).
    pub fn cells(&self) -> [String; OTP_LENGTH] {
        self.cells.map(|cell| cell.map(String::from).unwrap_or_default())
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_code(controller: &mut OtpEntryController, code: &str) -> Vec<EntryEvent> {
        code.chars()
            .enumerate()
            .map(|(i, c)| controller.set_digit(i, &c.to_string()))
            .collect()
    }

    #[test]
    fn test_non_digit_is_rejected_without_change() {
        let mut controller = OtpEntryController::new();
        controller.set_error("old error");

        assert_eq!(controller.set_digit(0, "a"), EntryEvent::Rejected);
        assert_eq!(controller.cells()[0], "");
        assert_eq!(controller.focus(), 0);
        assert_eq!(controller.error(), Some("old error"));
    }

    #[test]
    fn test_digit_advances_focus_and_clears_error() {
        let mut controller = OtpEntryController::new();
        controller.set_error("wrong code");

        assert_eq!(controller.set_digit(0, "7"), EntryEvent::Updated);
        assert_eq!(controller.cells()[0], "7");
        assert_eq!(controller.focus(), 1);
        assert_eq!(controller.error(), None);
    }

    #[test]
    fn test_last_character_wins() {
        let mut controller = OtpEntryController::new();
        controller.set_digit(2, "48");
        assert_eq!(controller.cells()[2], "8");
    }

    #[test]
    fn test_last_cell_keeps_focus() {
        let mut controller = OtpEntryController::new();
        controller.set_digit(5, "1");
        assert_eq!(controller.focus(), 5);
    }

    #[test]
    fn test_empty_input_clears_cell_without_advancing() {
        let mut controller = OtpEntryController::new();
        controller.set_digit(1, "3");
        controller.set_digit(1, "");
        assert_eq!(controller.cells()[1], "");
        assert_eq!(controller.focus(), 2);
    }

    #[test]
    fn test_backspace_moves_focus_only_from_empty_cell() {
        let mut controller = OtpEntryController::new();
        controller.set_digit(0, "1");
        controller.set_digit(1, "2");
        assert_eq!(controller.focus(), 2);

        controller.backspace(2);
        assert_eq!(controller.focus(), 1);
        assert_eq!(controller.cells()[1], "2", "previous cell is not deleted");

        controller.backspace(1);
        assert_eq!(controller.focus(), 1, "non-empty cell keeps focus");

        controller.backspace(0);
        assert_eq!(controller.focus(), 1);
    }

    #[test]
    fn test_typing_six_digits_completes_once() {
        let mut controller = OtpEntryController::new();
        let events = type_code(&mut controller, "123456");

        let completions: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, EntryEvent::Completed(_)))
            .collect();
        assert_eq!(completions.len(), 1);
        assert!(matches!(events.last(), Some(EntryEvent::Completed(code)) if code.as_str() == "123456"));
    }

    #[test]
    fn test_paste_strips_non_digits() {
        let mut controller = OtpEntryController::new();

        let event = controller.paste_bulk("12ab3456");

        assert_eq!(controller.cells(), ["1", "2", "3", "4", "5", "6"].map(String::from));
        assert!(matches!(event, EntryEvent::Completed(code) if code.as_str() == "123456"));
        assert!(controller.is_complete());
    }

    #[test]
    fn test_paste_keeps_first_six_digits() {
        let mut controller = OtpEntryController::new();
        controller.paste_bulk("987654321");
        assert_eq!(controller.cells(), ["9", "8", "7", "6", "5", "4"].map(String::from));
    }

    #[test]
    fn test_short_paste_overwrites_from_left() {
        let mut controller = OtpEntryController::new();
        type_code(&mut controller, "00000");

        let event = controller.paste_bulk("12");

        assert_eq!(event, EntryEvent::Updated);
        assert_eq!(controller.cells(), ["1", "2", "0", "0", "0", ""].map(String::from));
        assert_eq!(controller.focus(), 2);
    }

    #[test]
    fn test_no_second_completion_until_reset() {
        let mut controller = OtpEntryController::new();
        assert!(matches!(controller.paste_bulk("123456"), EntryEvent::Completed(_)));

        // Re-completing the buffer without a reset does not fire again.
        assert_eq!(controller.set_digit(5, "9"), EntryEvent::Updated);
        assert_eq!(controller.paste_bulk("654321"), EntryEvent::Updated);

        controller.reset();
        assert_eq!(controller.cells(), <[String; OTP_LENGTH]>::default());
        assert_eq!(controller.focus(), 0);
        assert!(matches!(controller.paste_bulk("654321"), EntryEvent::Completed(_)));
    }
}
