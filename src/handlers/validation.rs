//! Request validation performed at the HTTP edge, before anything reaches the store.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::database::models::profile::normalize_phone;
use crate::database::models::{
    AccountPatch, AgentPatch, AgentSearch, NewAccount, NewAgent, NewProfile, NewVerificationRequest, ProfilePatch,
    ProfileSearch, RejectBody,
};
use crate::error::ApiError;

/// ISO 4217 codes accounts may be opened in
pub const SUPPORTED_CURRENCIES: &[&str] = &["USD", "SGD", "EUR", "MYR", "GBP", "JPY", "AUD", "CAD", "CNY", "INR"];

pub const MINIMUM_AGE: i32 = 18;

const MAX_REASON_LEN: usize = 500;

pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// Collects per-field messages; the first message for a field wins
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: HashMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Invalid request", Some(self.errors)))
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn age_on(date_of_birth: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - date_of_birth.year();
    if (on.month(), on.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.len() > 254 || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// `+` optional, then a non-zero digit followed by 9 to 14 digits, after
/// spaces and hyphens are removed
pub fn is_valid_phone(value: &str) -> bool {
    let normalized = normalize_phone(value.trim());
    let digits = normalized.strip_prefix('+').unwrap_or(&normalized);
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) if ('1'..='9').contains(&first) => {}
        _ => return false,
    }
    let rest = chars.as_str();
    (9..=14).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_postal(value: &str) -> bool {
    let value = value.trim();
    (4..=10).contains(&value.chars().count())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ')
}

fn length_between(value: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&value.trim().chars().count())
}

fn check_currency(errors: &mut FieldErrors, currency: &str) {
    let code = currency.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        errors.add("currency", "Invalid currency code");
    } else if !SUPPORTED_CURRENCIES.contains(&code.as_str()) {
        errors.add("currency", "Unsupported currency code");
    }
}

fn check_deposit(errors: &mut FieldErrors, deposit: Decimal) {
    errors.check(!deposit.is_sign_negative() || deposit.is_zero(), "initial_deposit", "initial_deposit must be >= 0");
}

fn check_opening_date(errors: &mut FieldErrors, date: NaiveDate) {
    errors.check(date <= today(), "opening_date", "Date cannot be in the future");
}

fn check_name(errors: &mut FieldErrors, field: &str, value: &str) {
    errors.check(length_between(value, 1, 100), field, "Must be between 1 and 100 characters");
}

fn check_email(errors: &mut FieldErrors, value: &str) {
    errors.check(is_valid_email(value), "email", "Invalid email address");
}

fn check_date_of_birth(errors: &mut FieldErrors, dob: NaiveDate) {
    let today = today();
    if dob > today {
        errors.add("date_of_birth", "date_of_birth cannot be in the future");
    } else if age_on(dob, today) < MINIMUM_AGE {
        errors.add("date_of_birth", "Must be at least 18 years old");
    }
}

fn check_phone(errors: &mut FieldErrors, value: &str) {
    errors.check(is_valid_phone(value), "phone_number", "Invalid phone number");
}

fn check_address(errors: &mut FieldErrors, value: &str) {
    errors.check(length_between(value, 5, 100), "address", "Address must be between 5 and 100 characters");
}

fn check_place(errors: &mut FieldErrors, field: &str, value: &str) {
    errors.check(length_between(value, 2, 50), field, "Must be between 2 and 50 characters");
}

fn check_postal(errors: &mut FieldErrors, value: &str) {
    errors.check(is_valid_postal(value), "postal", "Invalid postal code");
}

pub fn check_reason(errors: &mut FieldErrors, field: &str, reason: Option<&str>) {
    if let Some(reason) = reason {
        errors.check(length_between(reason, 1, MAX_REASON_LEN), field, "Must be between 1 and 500 characters");
    }
}

impl Validate for NewAccount {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_currency(&mut errors, &self.currency);
        check_deposit(&mut errors, self.initial_deposit);
        if let Some(date) = self.opening_date {
            check_opening_date(&mut errors, date);
        }
        errors.into_result()
    }
}

impl Validate for AccountPatch {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(currency) = &self.currency {
            check_currency(&mut errors, currency);
        }
        if let Some(deposit) = self.initial_deposit {
            check_deposit(&mut errors, deposit);
        }
        if let Some(date) = self.opening_date {
            check_opening_date(&mut errors, date);
        }
        errors.into_result()
    }
}

impl Validate for NewAgent {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "first_name", &self.first_name);
        check_name(&mut errors, "last_name", &self.last_name);
        check_email(&mut errors, &self.email);
        errors.into_result()
    }
}

impl Validate for AgentPatch {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.first_name {
            check_name(&mut errors, "first_name", name);
        }
        if let Some(name) = &self.last_name {
            check_name(&mut errors, "last_name", name);
        }
        if let Some(email) = &self.email {
            check_email(&mut errors, email);
        }
        errors.into_result()
    }
}

impl Validate for NewProfile {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, "first_name", &self.first_name);
        check_name(&mut errors, "last_name", &self.last_name);
        check_date_of_birth(&mut errors, self.date_of_birth);
        check_email(&mut errors, &self.email);
        check_phone(&mut errors, &self.phone_number);
        check_address(&mut errors, &self.address);
        check_place(&mut errors, "city", &self.city);
        check_place(&mut errors, "state", &self.state);
        check_place(&mut errors, "country", &self.country);
        check_postal(&mut errors, &self.postal);
        errors.into_result()
    }
}

impl Validate for ProfilePatch {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.first_name {
            check_name(&mut errors, "first_name", name);
        }
        if let Some(name) = &self.last_name {
            check_name(&mut errors, "last_name", name);
        }
        if let Some(dob) = self.date_of_birth {
            check_date_of_birth(&mut errors, dob);
        }
        if let Some(email) = &self.email {
            check_email(&mut errors, email);
        }
        if let Some(phone) = &self.phone_number {
            check_phone(&mut errors, phone);
        }
        if let Some(address) = &self.address {
            check_address(&mut errors, address);
        }
        for (field, value) in [("city", &self.city), ("state", &self.state), ("country", &self.country)] {
            if let Some(value) = value {
                check_place(&mut errors, field, value);
            }
        }
        if let Some(postal) = &self.postal {
            check_postal(&mut errors, postal);
        }
        errors.into_result()
    }
}

impl Validate for NewVerificationRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

impl Validate for RejectBody {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_reason(&mut errors, "reason", self.reason.as_deref());
        errors.into_result()
    }
}

fn check_field_search(
    errors: &mut FieldErrors,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
) {
    if first_name.is_none() && last_name.is_none() && email.is_none() {
        errors.add("search", "Provide at least one field to search");
        return;
    }
    if let Some(name) = first_name {
        check_name(errors, "first_name", name);
    }
    if let Some(name) = last_name {
        check_name(errors, "last_name", name);
    }
    if let Some(email) = email {
        check_email(errors, email);
    }
}

impl Validate for AgentSearch {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_field_search(&mut errors, self.first_name.as_deref(), self.last_name.as_deref(), self.email.as_deref());
        errors.into_result()
    }
}

impl Validate for ProfileSearch {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        check_field_search(&mut errors, self.first_name.as_deref(), self.last_name.as_deref(), self.email.as_deref());
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{AccountType, Gender};
    use uuid::Uuid;

    fn field_errors(err: ApiError) -> HashMap<String, String> {
        match err {
            ApiError::ValidationError { field_errors: Some(errors), .. } => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    fn account(currency: &str, deposit: Decimal) -> NewAccount {
        NewAccount {
            client_id: Uuid::new_v4(),
            account_type: AccountType::Savings,
            opening_date: None,
            initial_deposit: deposit,
            currency: currency.to_string(),
            branch_id: Uuid::new_v4(),
        }
    }

    fn profile() -> NewProfile {
        NewProfile {
            first_name: "Mei".to_string(),
            last_name: "Lim".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            gender: Gender::F,
            email: "mei@example.com".to_string(),
            phone_number: "+65 9123 4567 8".to_string(),
            address: "1 Harbour Road".to_string(),
            city: "Singapore".to_string(),
            state: "SG".to_string(),
            country: "Singapore".to_string(),
            postal: "018956".to_string(),
        }
    }

    #[test]
    fn accounts_accept_whitelisted_currencies_in_any_case() {
        assert!(account("usd", Decimal::new(100, 0)).validate().is_ok());
        assert!(account("EUR", Decimal::ZERO).validate().is_ok());
    }

    #[test]
    fn accounts_reject_unknown_currency_and_negative_deposit() {
        let errors = field_errors(account("XYZ", Decimal::new(-1, 0)).validate().unwrap_err());
        assert_eq!(errors["currency"], "Unsupported currency code");
        assert!(errors.contains_key("initial_deposit"));

        let errors = field_errors(account("US", Decimal::ZERO).validate().unwrap_err());
        assert_eq!(errors["currency"], "Invalid currency code");
    }

    #[test]
    fn opening_date_cannot_be_in_the_future() {
        let mut input = account("SGD", Decimal::ZERO);
        input.opening_date = Some(today() + chrono::Duration::days(1));
        let errors = field_errors(input.validate().unwrap_err());
        assert!(errors.contains_key("opening_date"));
    }

    #[test]
    fn profile_happy_path() {
        assert!(profile().validate().is_ok());
    }

    #[test]
    fn profiles_must_be_adults() {
        let mut input = profile();
        input.date_of_birth = today() - chrono::Duration::days(365 * 10);
        let errors = field_errors(input.validate().unwrap_err());
        assert_eq!(errors["date_of_birth"], "Must be at least 18 years old");
    }

    #[test]
    fn age_counts_birthdays() {
        let dob = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2018, 6, 14).unwrap()), 17);
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2018, 6, 15).unwrap()), 18);
    }

    #[test]
    fn phone_numbers() {
        assert!(is_valid_phone("+65 8293 8737 1"));
        assert!(is_valid_phone("92-3749-93872"));
        assert!(!is_valid_phone("0123456789"));
        assert!(!is_valid_phone("+1234"));
        assert!(!is_valid_phone("+1 234 567 89a0"));
    }

    #[test]
    fn emails_and_postal_codes() {
        assert!(is_valid_email("a.b@example.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("@example.com"));

        assert!(is_valid_postal("SW1A 1AA"));
        assert!(!is_valid_postal("12"));
        assert!(!is_valid_postal("12#45"));
    }

    #[test]
    fn profile_patch_checks_only_supplied_fields() {
        let patch = ProfilePatch { city: Some("X".to_string()), ..Default::default() };
        let errors = field_errors(patch.validate().unwrap_err());
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("city"));

        assert!(ProfilePatch::default().validate().is_ok());
    }

    #[test]
    fn field_search_needs_one_field() {
        let errors = field_errors(AgentSearch::default().validate().unwrap_err());
        assert!(errors.contains_key("search"));

        let search = AgentSearch { email: Some("not-an-email".to_string()), ..Default::default() };
        assert!(search.validate().is_err());
    }
}
