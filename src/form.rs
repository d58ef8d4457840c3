// 📝 Form state
// The interactive surface without the rendering: which field is focused,
// what each widget currently holds, and how key presses change it.
// Numeric widgets clamp to their bounds, so a submitted input is always in range.

use crate::catalog::{Clarity, Color, Cut, DiamondInput, Grade, NumericField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Numeric(NumericField),
    Cut,
    Color,
    Clarity,
    Predict,
}

impl FormField {
    /// Top-to-bottom widget order
    pub const ALL: [FormField; 10] = [
        FormField::Numeric(NumericField::Carat),
        FormField::Numeric(NumericField::Depth),
        FormField::Numeric(NumericField::Table),
        FormField::Numeric(NumericField::X),
        FormField::Numeric(NumericField::Y),
        FormField::Numeric(NumericField::Z),
        FormField::Cut,
        FormField::Color,
        FormField::Clarity,
        FormField::Predict,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Numeric(NumericField::Carat) => "Carat",
            FormField::Numeric(NumericField::Depth) => "Depth",
            FormField::Numeric(NumericField::Table) => "Table",
            FormField::Numeric(NumericField::X) => "X",
            FormField::Numeric(NumericField::Y) => "Y",
            FormField::Numeric(NumericField::Z) => "Z",
            FormField::Cut => "Cut",
            FormField::Color => "Color",
            FormField::Clarity => "Clarity",
            FormField::Predict => "Predict",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormState {
    input: DiamondInput,
    selected: usize,
}

impl Default for FormState {
    fn default() -> Self {
        FormState {
            input: DiamondInput::default(),
            selected: 0,
        }
    }
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> DiamondInput {
        self.input
    }

    pub fn selected(&self) -> FormField {
        FormField::ALL[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn next_field(&mut self) {
        self.selected = (self.selected + 1) % FormField::ALL.len();
    }

    pub fn previous_field(&mut self) {
        self.selected = (self.selected + FormField::ALL.len() - 1) % FormField::ALL.len();
    }

    pub fn focus_predict(&mut self) {
        self.selected = FormField::ALL.len() - 1;
    }

    /// Move the focused widget `steps` notches (negative = down / previous).
    ///
    /// Numeric widgets move by their step and clamp; choice widgets cycle.
    pub fn adjust(&mut self, steps: i32) {
        match self.selected() {
            FormField::Numeric(field) => {
                let bounds = field.bounds();
                let raw = self.input.numeric(field) + bounds.step * steps as f64;
                let value = round_to(bounds.clamp(raw), decimals(bounds.step));
                self.input.set_numeric(field, value);
            }
            FormField::Cut => self.input.cut = cycle::<Cut>(self.input.cut, steps),
            FormField::Color => self.input.color = cycle::<Color>(self.input.color, steps),
            FormField::Clarity => self.input.clarity = cycle::<Clarity>(self.input.clarity, steps),
            FormField::Predict => {}
        }
    }

    /// Set a numeric widget directly; out-of-range values are clamped
    pub fn set_numeric(&mut self, field: NumericField, value: f64) {
        self.input.set_numeric(field, field.bounds().clamp(value));
    }

    pub fn reset(&mut self) {
        self.input = DiamondInput::default();
    }

    /// Text shown in the widget for `field`
    pub fn display(&self, field: FormField) -> String {
        match field {
            FormField::Numeric(numeric) => {
                let places = decimals(numeric.bounds().step);
                format!("{:.*}", places, self.input.numeric(numeric))
            }
            FormField::Cut => self.input.cut.label().to_string(),
            FormField::Color => self.input.color.label().to_string(),
            FormField::Clarity => self.input.clarity.label().to_string(),
            FormField::Predict => "[ Predict ]".to_string(),
        }
    }

    /// Range hint for numeric widgets, e.g. `0.00 - 5.00`
    pub fn hint(&self, field: FormField) -> String {
        match field {
            FormField::Numeric(numeric) => {
                let bounds = numeric.bounds();
                let places = decimals(bounds.step);
                format!("{:.*} - {:.*}", places, bounds.min, places, bounds.max)
            }
            FormField::Cut => Cut::ALL.len().to_string() + " grades",
            FormField::Color => Color::ALL.len().to_string() + " grades",
            FormField::Clarity => Clarity::ALL.len().to_string() + " grades",
            FormField::Predict => String::new(),
        }
    }
}

fn cycle<G: Grade>(grade: G, steps: i32) -> G {
    let mut current = grade;
    for _ in 0..steps.unsigned_abs() {
        current = if steps > 0 {
            current.cycle_next()
        } else {
            current.cycle_previous()
        };
    }
    current
}

/// Decimal places implied by a widget step
fn decimals(step: f64) -> usize {
    if step >= 1.0 {
        0
    } else if step >= 0.1 {
        1
    } else {
        2
    }
}

fn round_to(value: f64, places: usize) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_on_carat_with_defaults() {
        let form = FormState::new();

        assert_eq!(form.selected(), FormField::Numeric(NumericField::Carat));
        assert_eq!(form.input(), DiamondInput::default());
        assert_eq!(form.display(form.selected()), "0.50");
    }

    #[test]
    fn test_field_navigation_wraps() {
        let mut form = FormState::new();

        form.previous_field();
        assert_eq!(form.selected(), FormField::Predict);

        form.next_field();
        assert_eq!(form.selected(), FormField::Numeric(NumericField::Carat));

        for _ in 0..6 {
            form.next_field();
        }
        assert_eq!(form.selected(), FormField::Cut);
    }

    #[test]
    fn test_numeric_adjust_steps_without_drift() {
        let mut form = FormState::new();

        form.adjust(1);
        assert_eq!(form.input().carat, 0.51);

        for _ in 0..9 {
            form.adjust(1);
        }
        assert_eq!(form.input().carat, 0.6);
        assert_eq!(form.display(FormField::Numeric(NumericField::Carat)), "0.60");
    }

    #[test]
    fn test_numeric_adjust_clamps_to_bounds() {
        let mut form = FormState::new();

        form.adjust(-1000);
        assert_eq!(form.input().carat, 0.0);

        form.adjust(10_000);
        assert_eq!(form.input().carat, 5.0);

        form.set_numeric(NumericField::Depth, 99.0);
        assert_eq!(form.input().depth, 70.0);
        assert!(form.input().validate().is_ok());
    }

    #[test]
    fn test_choice_adjust_cycles() {
        let mut form = FormState::new();
        for _ in 0..6 {
            form.next_field();
        }

        form.adjust(1);
        assert_eq!(form.input().cut, Cut::Good);

        form.adjust(-2);
        assert_eq!(form.input().cut, Cut::Ideal);

        form.next_field();
        form.adjust(10);
        // 10 mod 7 = 3 steps from D
        assert_eq!(form.input().color, Color::G);

        form.next_field();
        form.adjust(-1);
        assert_eq!(form.input().clarity, Clarity::IF);
        assert_eq!(form.display(FormField::Clarity), "IF");
    }

    #[test]
    fn test_predict_button_ignores_adjust() {
        let mut form = FormState::new();
        form.focus_predict();

        form.adjust(5);

        assert_eq!(form.selected(), FormField::Predict);
        assert_eq!(form.input(), DiamondInput::default());
    }

    #[test]
    fn test_reset_restores_defaults_keeps_focus() {
        let mut form = FormState::new();
        form.adjust(20);
        form.next_field();

        form.reset();

        assert_eq!(form.input(), DiamondInput::default());
        assert_eq!(form.selected_index(), 1);
    }

    #[test]
    fn test_hints() {
        let form = FormState::new();

        assert_eq!(form.hint(FormField::Numeric(NumericField::Depth)), "50.0 - 70.0");
        assert_eq!(form.hint(FormField::Clarity), "8 grades");
    }
}
