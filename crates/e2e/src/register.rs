//! Registration form suite
//!
//! Field presence, client-side validation messages and the happy-path fill
//! of the Melaka dashboard sign-up page. Validation is done by the page;
//! these scenarios only assert on what it renders.

use crate::scenario::{Scenario, Step};
use crate::selector::Selector;

pub const DEFAULT_BASE_URL: &str = "https://dashboard.melaka.app";
pub const REGISTER_PATH: &str = "/register";

/// `data-testid` values of the form controls
pub mod ids {
    pub const NAME: &str = "register__text-field__name";
    pub const PHONE: &str = "register__text-field__phone-number";
    pub const BUSINESS_NAME: &str = "register__text-field__business-name";
    pub const EMAIL: &str = "register__text-field__email";
    pub const PASSWORD: &str = "register__text-field__password";
    pub const CONFIRM_PASSWORD: &str = "register__text-field__confirm-password";

    pub const RADIO_DISTRIBUTOR: &str = "register__radio-button__distributor";
    pub const RADIO_TOKO_RETAIL: &str = "register__radio-button__toko-retail";
    pub const RADIO_BRAND: &str = "register__radio-button__brand";
    pub const RADIO_PENJUAL_ONLINE: &str = "register__radio-button__penjual-online";

    pub const TERMS: &str = "register__checkbox__tnc";
    pub const SIGN_UP: &str = "register__button__sign-up";

    /// Text fields, in page order
    pub const TEXT_FIELDS: [&str; 6] = [NAME, PHONE, BUSINESS_NAME, EMAIL, PASSWORD, CONFIRM_PASSWORD];

    /// Distributor type options
    pub const DISTRIBUTOR_TYPES: [&str; 4] =
        [RADIO_DISTRIBUTOR, RADIO_TOKO_RETAIL, RADIO_BRAND, RADIO_PENJUAL_ONLINE];
}

/// Validation messages rendered by the page (Indonesian)
pub mod messages {
    pub const REQUIRED: &str = "Wajib diisi";
    pub const NAME_TOO_SHORT: &str = "min. 5 karakter.";
    pub const PHONE_TOO_SHORT: &str = "tidak boleh kurang dari 10";
    pub const PHONE_TOO_LONG: &str = "lebih dari 12 karakter";
    pub const BUSINESS_NAME_TOO_SHORT: &str = "tidak boleh kurang dari 5 karakter.";
    pub const EMAIL_INVALID: &str = "Harap isi dengan format yang benar.";
    pub const PASSWORD_WEAK: &str = "Min. 8 karakter, harus kombinasi dari huruf dan angka.";
    pub const PASSWORD_MISMATCH: &str = "Belum sesuai dengan kata sandi.";
}

/// Input that passes every client-side rule
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub phone: String,
    pub business_name: String,
    pub distributor_type: &'static str,
    pub email: String,
    pub password: String,
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            name: "Edison Valentino".to_string(),
            phone: "812345678921".to_string(),
            business_name: "Melaka Store".to_string(),
            distributor_type: ids::RADIO_DISTRIBUTOR,
            email: "edison.valentino@example.com".to_string(),
            password: "Password123!".to_string(),
        }
    }
}

/// The form control carrying `id`: the sign-up button, or an input
pub fn control(id: &str) -> Selector {
    let tag = if id == ids::SIGN_UP { "button" } else { "input" };
    Selector::tagged(tag, id)
}

fn field(id: &str) -> Selector {
    control(id)
}

/// Base scenario on the register page, tagged for filtering
fn register_scenario(name: &str, description: &str) -> Scenario {
    Scenario::new(name, REGISTER_PATH)
        .describe(description)
        .tag("register")
}

/// Accept the terms and press sign-up so the page validates every field
fn submit() -> [Step; 2] {
    [Step::click(field(ids::TERMS)), Step::click(field(ids::SIGN_UP))]
}

/// Fill one field with an invalid value, submit, and expect `message` under it
pub fn invalid_value(name: &str, field_id: &str, value: &str, message: &str) -> Scenario {
    register_scenario(name, &format!("'{}' in {} shows \"{}\"", value, field_id, message))
        .tag("validation")
        .step(Step::fill(field(field_id), value))
        .steps(submit())
        .step(Step::assert_text_contains(Selector::error_of(field_id), message))
}

/// Every control is present, valid data leaves no error and sign-up is clickable.
///
/// Tab is pressed after the last field so its blur validation runs before the
/// error checks. The registration is not actually submitted: the page is
/// production.
pub fn happy_path(data: &Registration) -> Scenario {
    let presence = ids::TEXT_FIELDS[..3]
        .iter()
        .copied()
        .chain(ids::DISTRIBUTOR_TYPES)
        .chain(ids::TEXT_FIELDS[3..].iter().copied())
        .chain([ids::TERMS, ids::SIGN_UP])
        .map(|id| Step::assert_visible(field(id)));

    let no_errors = ids::TEXT_FIELDS
        .iter()
        .map(|id| Step::assert_hidden(Selector::error_of(id)));

    register_scenario("e2e-register", "Fill the form with valid data")
        .tag("smoke")
        .steps(presence)
        .steps([
            Step::fill(field(ids::NAME), data.name.as_str()),
            Step::fill(field(ids::PHONE), data.phone.as_str()),
            Step::fill(field(ids::BUSINESS_NAME), data.business_name.as_str()),
            Step::check(field(data.distributor_type)),
            Step::fill(field(ids::EMAIL), data.email.as_str()),
            Step::fill(field(ids::PASSWORD), data.password.as_str()),
            Step::fill(field(ids::CONFIRM_PASSWORD), data.password.as_str()),
            Step::press(field(ids::CONFIRM_PASSWORD), "Tab"),
            Step::check(field(ids::TERMS)),
        ])
        .steps(no_errors)
        .steps([
            Step::assert_enabled(field(ids::SIGN_UP)),
            Step::trial_click(field(ids::SIGN_UP)),
        ])
}

/// Submitting an empty form marks every required text field
pub fn empty_fields() -> Scenario {
    register_scenario("empty-fields", "Required fields left empty")
        .tag("validation")
        .steps(submit())
        .steps(
            ids::TEXT_FIELDS
                .iter()
                .map(|id| Step::assert_text_contains(Selector::error_of(id), messages::REQUIRED)),
        )
}

pub fn confirm_password_mismatch() -> Scenario {
    register_scenario(
        "confirm-password-mismatch",
        "Confirmation differing from the password",
    )
    .tag("validation")
    .steps([
        Step::fill(field(ids::PASSWORD), "HAHAHA"),
        Step::fill(field(ids::CONFIRM_PASSWORD), "hihihihi"),
    ])
    .steps(submit())
    .step(Step::assert_text_contains(
        Selector::error_of(ids::CONFIRM_PASSWORD),
        messages::PASSWORD_MISMATCH,
    ))
}

/// The full suite in a stable order
pub fn suite() -> Vec<Scenario> {
    vec![
        happy_path(&Registration::default()),
        empty_fields(),
        invalid_value("name-under-5", ids::NAME, "edi", messages::NAME_TOO_SHORT),
        invalid_value("phone-under-10", ids::PHONE, "123", messages::PHONE_TOO_SHORT),
        // 14 digits; the page's limit is 12
        invalid_value("phone-over-12", ids::PHONE, "12345678987765", messages::PHONE_TOO_LONG),
        invalid_value(
            "business-name-under-5",
            ids::BUSINESS_NAME,
            "tahu",
            messages::BUSINESS_NAME_TOO_SHORT,
        ),
        invalid_value("invalid-email", ids::EMAIL, "autoauto.com", messages::EMAIL_INVALID),
        invalid_value("password-under-8", ids::PASSWORD, "hehe22", messages::PASSWORD_WEAK),
        invalid_value(
            "password-without-number",
            ids::PASSWORD,
            "hahahahahaha",
            messages::PASSWORD_WEAK,
        ),
        confirm_password_mismatch(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_names_are_unique() {
        let suite = suite();
        let mut names: Vec<_> = suite.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), suite.len());
        assert_eq!(suite.len(), 10);
    }

    #[test]
    fn test_every_scenario_is_valid_and_targets_register() {
        for scenario in suite() {
            scenario.validate().unwrap();
            assert_eq!(scenario.url, REGISTER_PATH);
            assert!(scenario.tags.iter().any(|t| t == "register"));
        }
    }

    #[test]
    fn test_happy_path_checks_presence_of_all_controls() {
        let scenario = happy_path(&Registration::default());
        let visible: Vec<_> = scenario
            .steps
            .iter()
            .filter(|s| matches!(s, Step::Assert { visible: Some(true), .. }))
            .collect();
        assert_eq!(visible.len(), 12);
    }

    #[test]
    fn test_happy_path_ends_with_clickable_sign_up() {
        let scenario = happy_path(&Registration::default());
        let last = scenario.steps.last().unwrap();
        assert_eq!(last, &Step::trial_click(control(ids::SIGN_UP)));
    }

    #[test]
    fn test_controls_are_qualified_by_element() {
        assert_eq!(control(ids::SIGN_UP).as_str(), r#"button[data-testid="register__button__sign-up"]"#);
        assert_eq!(control(ids::TERMS).as_str(), r#"input[data-testid="register__checkbox__tnc"]"#);
        assert_eq!(control(ids::NAME).as_str(), r#"input[data-testid="register__text-field__name"]"#);
    }

    #[test]
    fn test_happy_path_blurs_last_field_before_error_checks() {
        let steps = happy_path(&Registration::default()).steps;
        let blur = steps
            .iter()
            .position(|s| s == &Step::press(control(ids::CONFIRM_PASSWORD), "Tab"))
            .unwrap();
        let first_hidden = steps
            .iter()
            .position(|s| matches!(s, Step::Assert { visible: Some(false), .. }))
            .unwrap();
        assert!(blur < first_hidden);
    }

    #[test]
    fn test_default_registration_passes_client_rules() {
        let data = Registration::default();
        assert!(data.name.chars().count() >= 5);
        assert!((10..=12).contains(&data.phone.len()));
        assert!(data.business_name.chars().count() >= 5);
        assert!(data.email.contains('@'));
        assert!(data.password.len() >= 8);
        assert!(data.password.chars().any(|c| c.is_ascii_digit()));
        assert!(data.password.chars().any(|c| c.is_ascii_alphabetic()));
    }
}
