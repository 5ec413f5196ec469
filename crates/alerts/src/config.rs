//! Per-chat preferences.

use bfxgram_core::{TypeTag, UnknownTag};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pair used when a chat never set one.
pub const DEFAULT_PAIR: &str = "tBTCUSD";

/// Options settable through `/set`.
pub const VALID_OPTIONS: [&str; 2] = ["defaultpair", "calctype"];

/// More failed `/auth` attempts than this get a "blocked" reply.
pub const BLOCK_AFTER_FAILURES: i32 = 10;
/// More failed `/auth` attempts than this are ignored silently.
pub const IGNORE_AFTER_FAILURES: i32 = 20;

const CALC_PREFIXES: [&str; 4] = ["margin_sym_", "funding_sym_", "position_", "wallet_"];

#[derive(Error, Debug, PartialEq)]
pub enum OptionError {
    #[error("{0} is not a valid option")]
    UnknownOption(String),
    #[error("incorrect value {value} for {option}")]
    InvalidValue { option: String, value: String },
}

/// Result of an `/auth` attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Accepted,
    Rejected,
    /// Too many failures: told so, attempt still counted.
    Blocked,
    /// Way too many failures: no reply at all.
    Ignored,
}

/// Chat preferences stored in database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPrefs {
    /// Telegram chat ID
    pub chat_id: i64,
    /// Whether the chat passed `/auth`
    pub authenticated: bool,
    /// Failed `/auth` attempts since the last success
    pub failed_auth: i32,
    pub telegram_user: Option<String>,
    pub telegram_name: Option<String>,
    /// Trading pair used by commands when none is given
    pub default_pair: String,
    /// Calc request used by `/calc` without arguments
    pub calc_type: Option<String>,
    /// Type tags this chat does not want to receive
    pub disabled_tags: Vec<String>,
}

impl Default for ChatPrefs {
    fn default() -> Self {
        Self {
            chat_id: 0,
            authenticated: false,
            failed_auth: 0,
            telegram_user: None,
            telegram_name: None,
            default_pair: DEFAULT_PAIR.to_string(),
            calc_type: None,
            disabled_tags: Vec::new(),
        }
    }
}

impl ChatPrefs {
    /// Create new preferences for a chat.
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Default::default()
        }
    }

    /// Check if a message of this type should reach the chat.
    pub fn should_deliver(&self, tag: &str) -> bool {
        self.authenticated && !self.is_disabled(tag)
    }

    pub fn is_disabled(&self, tag: &str) -> bool {
        self.disabled_tags.iter().any(|t| t == tag)
    }

    /// Check a password and update the failure counter.
    pub fn attempt_auth(&mut self, password: &str, expected: &str) -> AuthOutcome {
        if self.failed_auth > IGNORE_AFTER_FAILURES {
            return AuthOutcome::Ignored;
        }
        if self.failed_auth > BLOCK_AFTER_FAILURES {
            self.failed_auth += 1;
            return AuthOutcome::Blocked;
        }
        if !expected.is_empty() && password == expected {
            self.authenticated = true;
            self.failed_auth = 0;
            AuthOutcome::Accepted
        } else {
            self.authenticated = false;
            self.failed_auth += 1;
            AuthOutcome::Rejected
        }
    }

    /// Apply a `/set <name> <value>` option.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), OptionError> {
        let invalid = || OptionError::InvalidValue {
            option: name.to_string(),
            value: value.to_string(),
        };
        match name {
            "defaultpair" => {
                self.default_pair = normalize_pair(value).ok_or_else(invalid)?;
            }
            "calctype" => {
                if !is_valid_calc(value) {
                    return Err(invalid());
                }
                self.calc_type = Some(value.to_string());
            }
            other => return Err(OptionError::UnknownOption(other.to_string())),
        }
        Ok(())
    }

    pub fn disable(&mut self, tags: &[TypeTag]) {
        for tag in tags {
            if !self.is_disabled(tag.as_str()) {
                self.disabled_tags.push(tag.as_str().to_string());
            }
        }
        self.disabled_tags.sort();
    }

    pub fn enable(&mut self, tags: &[TypeTag]) {
        self.disabled_tags
            .retain(|t| !tags.iter().any(|tag| t == tag.as_str()));
    }

    /// Calc request for `/calc [type]`, falling back to the stored default.
    pub fn calc_request(&self, arg: &str) -> Option<String> {
        let arg = arg.trim();
        if arg.is_empty() {
            self.calc_type.clone()
        } else {
            Some(arg.to_string())
        }
    }
}

/// Split `/enable`/`/disable` arguments into known tags and unknown words.
pub fn parse_tags(args: &str) -> (Vec<TypeTag>, Vec<String>) {
    let mut known = Vec::new();
    let mut unknown = Vec::new();
    for word in args.split(|c: char| c.is_whitespace() || c == ',') {
        if word.is_empty() {
            continue;
        }
        match word.parse::<TypeTag>() {
            // Heartbeats never reach a chat.
            Ok(TypeTag::Heartbeat) => unknown.push(word.to_string()),
            Ok(tag) => known.push(tag),
            Err(UnknownTag(word)) => unknown.push(word),
        }
    }
    (known, unknown)
}

/// `btcusd`, `BTCUSD`, `tbtcusd` and `tBTCUSD` all become `tBTCUSD`.
///
/// A leading `t` is the trading prefix when a plain six letter pair
/// follows it, or when it is lowercase and followed by an uppercase symbol.
pub fn normalize_pair(value: &str) -> Option<String> {
    let value = value.trim();
    let body = value
        .strip_prefix(['t', 'T'])
        .filter(|rest| {
            let plain = rest.len() == 6 && !rest.contains(':');
            let marked = value.starts_with('t')
                && rest.chars().next().is_some_and(|c| c.is_ascii_uppercase());
            plain || marked
        })
        .unwrap_or(value);
    let valid = (6..=16).contains(&body.len())
        && body.chars().all(|c| c.is_ascii_alphanumeric() || c == ':');
    valid.then(|| format!("t{}", body.to_ascii_uppercase()))
}

/// Calc requests are `margin_base` or one of the known prefixes plus a name.
pub fn is_valid_calc(request: &str) -> bool {
    request == "margin_base"
        || CALC_PREFIXES.iter().any(|prefix| {
            request
                .strip_prefix(prefix)
                .is_some_and(|rest| !rest.is_empty() && !rest.contains(char::is_whitespace))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_prefs_are_unauthenticated() {
        let prefs = ChatPrefs::new(42);
        assert_eq!(prefs.chat_id, 42);
        assert_eq!(prefs.default_pair, DEFAULT_PAIR);
        assert!(!prefs.should_deliver("on"));
    }

    #[test]
    fn test_auth_success_resets_failures() {
        let mut prefs = ChatPrefs::new(1);
        assert_eq!(prefs.attempt_auth("nope", "secret"), AuthOutcome::Rejected);
        assert_eq!(prefs.attempt_auth("nope", "secret"), AuthOutcome::Rejected);
        assert_eq!(prefs.failed_auth, 2);
        assert_eq!(prefs.attempt_auth("secret", "secret"), AuthOutcome::Accepted);
        assert!(prefs.authenticated);
        assert_eq!(prefs.failed_auth, 0);
    }

    #[test]
    fn test_auth_blocks_then_ignores() {
        let mut prefs = ChatPrefs::new(1);
        for _ in 0..=BLOCK_AFTER_FAILURES {
            assert_eq!(prefs.attempt_auth("x", "secret"), AuthOutcome::Rejected);
        }
        // Even the right password is refused once blocked.
        assert_eq!(prefs.attempt_auth("secret", "secret"), AuthOutcome::Blocked);
        assert!(!prefs.authenticated);

        while prefs.failed_auth <= IGNORE_AFTER_FAILURES {
            assert_eq!(prefs.attempt_auth("x", "secret"), AuthOutcome::Blocked);
        }
        let failures = prefs.failed_auth;
        assert_eq!(prefs.attempt_auth("secret", "secret"), AuthOutcome::Ignored);
        assert_eq!(prefs.failed_auth, failures);
    }

    #[test]
    fn test_empty_expected_password_never_matches() {
        let mut prefs = ChatPrefs::new(1);
        assert_eq!(prefs.attempt_auth("", ""), AuthOutcome::Rejected);
    }

    #[test]
    fn test_should_deliver_respects_disabled_tags() {
        let mut prefs = ChatPrefs::new(1);
        prefs.authenticated = true;
        prefs.disable(&[TypeTag::PositionUpdate, TypeTag::WalletUpdate]);
        assert!(!prefs.should_deliver("pu"));
        assert!(!prefs.should_deliver("wu"));
        assert!(prefs.should_deliver("on"));

        prefs.enable(&[TypeTag::PositionUpdate]);
        assert!(prefs.should_deliver("pu"));
        assert_eq!(prefs.disabled_tags, vec!["wu"]);
    }

    #[test]
    fn test_disable_is_idempotent() {
        let mut prefs = ChatPrefs::new(1);
        prefs.disable(&[TypeTag::OrderNew]);
        prefs.disable(&[TypeTag::OrderNew]);
        assert_eq!(prefs.disabled_tags, vec!["on"]);
    }

    #[test]
    fn test_parse_tags() {
        let (known, unknown) = parse_tags("on, oc pu  bogus hb");
        assert_eq!(
            known,
            vec![TypeTag::OrderNew, TypeTag::OrderCancel, TypeTag::PositionUpdate]
        );
        assert_eq!(unknown, vec!["bogus", "hb"]);
    }

    #[test]
    fn test_set_options() {
        let mut prefs = ChatPrefs::new(1);
        prefs.set_option("defaultpair", "iotusd").unwrap();
        assert_eq!(prefs.default_pair, "tIOTUSD");
        prefs.set_option("calctype", "position_tIOTUSD").unwrap();
        assert_eq!(prefs.calc_type.as_deref(), Some("position_tIOTUSD"));

        assert_eq!(
            prefs.set_option("graphtheme", "standard"),
            Err(OptionError::UnknownOption("graphtheme".to_string()))
        );
        assert!(matches!(
            prefs.set_option("calctype", "everything"),
            Err(OptionError::InvalidValue { .. })
        ));
        assert!(prefs.set_option("defaultpair", "x").is_err());
    }

    #[test]
    fn test_normalize_pair() {
        assert_eq!(normalize_pair("btcusd").as_deref(), Some("tBTCUSD"));
        assert_eq!(normalize_pair("tBTCUSD").as_deref(), Some("tBTCUSD"));
        assert_eq!(normalize_pair("BTCUSD").as_deref(), Some("tBTCUSD"));
        assert_eq!(normalize_pair("tbtcusd").as_deref(), Some("tBTCUSD"));
        assert_eq!(normalize_pair("TBTCUSD").as_deref(), Some("tBTCUSD"));
        assert_eq!(normalize_pair("trxusd").as_deref(), Some("tTRXUSD"));
        assert_eq!(normalize_pair("TESTBTC:TESTUSD").as_deref(), Some("tTESTBTC:TESTUSD"));
        assert_eq!(normalize_pair("tTESTBTC:TESTUSD").as_deref(), Some("tTESTBTC:TESTUSD"));
        assert_eq!(normalize_pair("usd"), None);
        assert_eq!(normalize_pair("btc usd"), None);
    }

    #[test]
    fn test_calc_request_falls_back_to_default() {
        let mut prefs = ChatPrefs::new(1);
        assert_eq!(prefs.calc_request(""), None);
        prefs.calc_type = Some("margin_base".to_string());
        assert_eq!(prefs.calc_request("  ").as_deref(), Some("margin_base"));
        assert_eq!(
            prefs.calc_request("wallet_exchange_USD").as_deref(),
            Some("wallet_exchange_USD")
        );
    }

    #[test]
    fn test_is_valid_calc() {
        assert!(is_valid_calc("margin_base"));
        assert!(is_valid_calc("margin_sym_tBTCUSD"));
        assert!(is_valid_calc("funding_sym_fUSD"));
        assert!(is_valid_calc("wallet_margin_USD"));
        assert!(!is_valid_calc("position_"));
        assert!(!is_valid_calc("orders"));
    }
}
