//! Telegram bot handlers.

use crate::config::{is_valid_calc, parse_tags, AuthOutcome, OptionError, VALID_OPTIONS};
use crate::db::Database;
use bfxgram_core::{preformatted as pre, TypeTag};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("Database error: {0}")]
    Db(#[from] crate::db::DbError),
}

/// Bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Check that the bot is running")]
    Start,
    #[command(description = "Authenticate this chat. Usage: /auth password")]
    Auth(String),
    #[command(description = "Set an option. Usage: /set defaultpair btcusd")]
    Set(String),
    #[command(description = "Stop receiving message types. Usage: /disable pu wu")]
    Disable(String),
    #[command(description = "Receive message types again. Usage: /enable pu wu")]
    Enable(String),
    #[command(description = "List message types and whether you receive them")]
    Types,
    #[command(description = "Request a calculation. Usage: /calc margin_sym_tBTCUSD")]
    Calc(String),
    #[command(description = "Show help. Usage: /help [command]")]
    Help(String),
}

/// Forwards calc requests to the feed connection.
pub type CalcRequester = Box<dyn Fn(Vec<String>) + Send + Sync>;

/// Who sent a command.
#[derive(Debug, Clone, Default)]
pub struct ChatIdentity {
    pub chat_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

impl ChatIdentity {
    fn from_message(msg: &Message) -> Self {
        let full_name = match (msg.chat.first_name(), msg.chat.last_name()) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.to_string()),
            (None, Some(last)) => Some(last.to_string()),
            (None, None) => None,
        };
        Self {
            chat_id: msg.chat.id.0,
            username: msg.chat.username().map(str::to_string),
            full_name,
        }
    }
}

/// Help text for one command, or the list of commands with help.
pub fn help_text(key: &str) -> String {
    let text = match key.trim_start_matches('/') {
        "auth" => "please run /auth password\nAUTH_PASS is set in the .env file",
        "set" => {
            "/set defaultpair symbol\n  ex : /set defaultpair iotusd\n\
             /set calctype type\n  ex : /set calctype position_tIOTUSD"
        }
        "calc" => {
            "Calculations are requested with the command : /calc type\n\
             Possible prefixes:\n    margin_base\n    margin_sym_SYMBOL\n    \
             funding_sym_SYMBOL\n    position_SYMBOL\n    wallet_WALLET-TYPE_CURRENCY\n\
             Or specify a default calculation using /set calctype"
        }
        "disable" | "enable" => {
            "/disable type [type...] stops messages of these types\n\
             /enable type [type...] turns them back on\n\
             ex : /disable pu wu\n\
             /types lists every type"
        }
        _ => "help is available for : auth set calc disable enable",
    };
    pre(text)
}

/// Executes commands against the preference store.
///
/// Kept apart from the bot so replies can be produced without a Telegram
/// connection.
pub struct CommandHandler {
    db: Database,
    auth_pass: String,
    calc: CalcRequester,
}

impl CommandHandler {
    pub fn new(db: Database, auth_pass: impl Into<String>, calc: CalcRequester) -> Self {
        Self {
            db,
            auth_pass: auth_pass.into(),
            calc,
        }
    }

    #[cfg(test)]
    fn db(&self) -> &Database {
        &self.db
    }

    /// Run a command and return the HTML reply, if any.
    pub async fn respond(
        &self,
        who: &ChatIdentity,
        cmd: Command,
    ) -> Result<Option<String>, TelegramError> {
        info!(
            chat_id = who.chat_id,
            user = who.username.as_deref().unwrap_or_default(),
            "Command {:?}",
            redacted(&cmd)
        );

        match cmd {
            Command::Start => Ok(Some("Here be Dragons".to_string())),
            Command::Help(key) => Ok(Some(help_text(&key))),
            Command::Auth(password) => self.auth(who, password.trim()).await,
            cmd => {
                let authenticated = self
                    .db
                    .get(who.chat_id)
                    .await?
                    .is_some_and(|prefs| prefs.authenticated);
                if !authenticated {
                    return Ok(Some(pre("Please authenticate")));
                }
                self.respond_authenticated(who.chat_id, cmd).await.map(Some)
            }
        }
    }

    async fn auth(&self, who: &ChatIdentity, password: &str) -> Result<Option<String>, TelegramError> {
        if password.is_empty() {
            return Ok(Some(help_text("auth")));
        }

        let mut prefs = self.db.get_or_create(who.chat_id).await?;
        let outcome = prefs.attempt_auth(password, &self.auth_pass);
        if matches!(outcome, AuthOutcome::Accepted | AuthOutcome::Rejected) {
            prefs.telegram_user = who.username.clone();
            prefs.telegram_name = who.full_name.clone();
        }
        if outcome != AuthOutcome::Ignored {
            self.db.update(&prefs).await?;
        }

        let reply = match outcome {
            AuthOutcome::Accepted => {
                info!(chat_id = who.chat_id, "Chat authenticated");
                Some(pre("authentication successful"))
            }
            AuthOutcome::Rejected => {
                warn!(chat_id = who.chat_id, failed = prefs.failed_auth, "Bad password");
                Some(pre("bad password"))
            }
            AuthOutcome::Blocked => Some("you are blocked".to_string()),
            AuthOutcome::Ignored => None,
        };
        Ok(reply)
    }

    async fn respond_authenticated(&self, chat_id: i64, cmd: Command) -> Result<String, TelegramError> {
        let mut prefs = self.db.get_or_create(chat_id).await?;

        let reply = match cmd {
            Command::Set(args) => {
                let mut words = args.split_whitespace();
                let (Some(name), Some(value)) = (words.next(), words.next()) else {
                    return Ok(help_text("set"));
                };
                match prefs.set_option(name, value) {
                    Ok(()) => {
                        self.db.update(&prefs).await?;
                        pre(&format!("option {} was set to {}", name, value))
                    }
                    Err(e @ OptionError::UnknownOption(_)) => pre(&format!(
                        "{}\nvalid options are {}",
                        e,
                        VALID_OPTIONS.join(" ")
                    )),
                    Err(e) => pre(&e.to_string()),
                }
            }

            Command::Disable(args) | Command::Enable(args) if args.trim().is_empty() => {
                help_text("disable")
            }

            Command::Disable(args) => {
                let (tags, unknown) = parse_tags(&args);
                prefs.disable(&tags);
                self.db.update(&prefs).await?;
                tag_change_reply("disabled", &tags, &unknown)
            }

            Command::Enable(args) => {
                let (tags, unknown) = parse_tags(&args);
                prefs.enable(&tags);
                self.db.update(&prefs).await?;
                tag_change_reply("enabled", &tags, &unknown)
            }

            Command::Types => {
                let lines: Vec<String> = TypeTag::ALL
                    .iter()
                    .filter(|tag| **tag != TypeTag::Heartbeat)
                    .map(|tag| {
                        let state = if prefs.is_disabled(tag.as_str()) { "off" } else { "on" };
                        format!("{:<16}{:<4}{}", tag.as_str(), state, tag.description())
                    })
                    .collect();
                pre(&lines.join("\n"))
            }

            Command::Calc(arg) => match prefs.calc_request(&arg) {
                Some(request) if is_valid_calc(&request) => {
                    (self.calc)(vec![request.clone()]);
                    pre(&format!("calc {} requested", request))
                }
                _ => help_text("calc"),
            },

            Command::Start | Command::Auth(_) | Command::Help(_) => help_text(""),
        };

        Ok(reply)
    }
}

fn tag_change_reply(verb: &str, tags: &[TypeTag], unknown: &[String]) -> String {
    let mut lines = Vec::new();
    if !tags.is_empty() {
        let names: Vec<&str> = tags.iter().map(|t| t.as_str()).collect();
        lines.push(format!("{} : {}", verb, names.join(" ")));
    }
    if !unknown.is_empty() {
        lines.push(format!("unknown types : {}", unknown.join(" ")));
    }
    pre(&lines.join("\n"))
}

fn redacted(cmd: &Command) -> Command {
    match cmd {
        Command::Auth(_) => Command::Auth("***".to_string()),
        other => other.clone(),
    }
}

/// Telegram bot wrapper.
pub struct TelegramBot {
    bot: Bot,
    handler: Arc<CommandHandler>,
}

impl TelegramBot {
    /// Create a new bot with the given token.
    pub fn new(token: &str, handler: CommandHandler) -> Self {
        let bot = Bot::new(token);
        Self {
            bot,
            handler: Arc::new(handler),
        }
    }

    /// Send an HTML message to a chat.
    pub async fn send_html(&self, chat_id: i64, message: &str) -> Result<(), TelegramError> {
        self.bot
            .send_message(ChatId(chat_id), message)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    /// Run the bot command handler until Ctrl-C.
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();
        let handler = Update::filter_message().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, cmd: Command| {
                let this = Arc::clone(&self);
                async move { this.handle_command(bot, msg, cmd).await }
            },
        );

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_command(
        &self,
        bot: Bot,
        msg: Message,
        cmd: Command,
    ) -> Result<(), TelegramError> {
        let who = ChatIdentity::from_message(&msg);
        if let Some(reply) = self.handler.respond(&who, cmd).await? {
            bot.send_message(msg.chat.id, reply)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct Fixture {
        handler: CommandHandler,
        calcs: Arc<Mutex<Vec<Vec<String>>>>,
    }

    async fn fixture() -> Fixture {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let calcs = Arc::new(Mutex::new(Vec::new()));
        let sink = calcs.clone();
        let calc: CalcRequester = Box::new(move |requests| sink.lock().unwrap().push(requests));
        Fixture {
            handler: CommandHandler::new(db, "hunter2", calc),
            calcs,
        }
    }

    fn alice() -> ChatIdentity {
        ChatIdentity {
            chat_id: 7,
            username: Some("alice".to_string()),
            full_name: Some("Alice Liddell".to_string()),
        }
    }

    async fn say(f: &Fixture, text: &str) -> Option<String> {
        let cmd = Command::parse(text, "bfxgram_bot").unwrap();
        f.handler.respond(&alice(), cmd).await.unwrap()
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start", "bot").unwrap(), Command::Start);
        assert_eq!(
            Command::parse("/auth hunter2", "bot").unwrap(),
            Command::Auth("hunter2".to_string())
        );
        assert_eq!(
            Command::parse("/disable pu wu", "bot").unwrap(),
            Command::Disable("pu wu".to_string())
        );
        assert_eq!(Command::parse("/help", "bot").unwrap(), Command::Help(String::new()));
    }

    #[tokio::test]
    async fn test_start_needs_no_auth() {
        let f = fixture().await;
        assert_eq!(say(&f, "/start").await.as_deref(), Some("Here be Dragons"));
    }

    #[tokio::test]
    async fn test_commands_require_auth() {
        let f = fixture().await;
        for text in ["/types", "/calc margin_base", "/disable pu", "/set calctype margin_base"] {
            assert_eq!(
                say(&f, text).await.as_deref(),
                Some("<pre>Please authenticate</pre>"),
                "{}",
                text
            );
        }
        assert!(f.calcs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auth_flow() {
        let f = fixture().await;
        assert_eq!(say(&f, "/auth wrong").await.as_deref(), Some("<pre>bad password</pre>"));
        assert_eq!(
            say(&f, "/auth hunter2").await.as_deref(),
            Some("<pre>authentication successful</pre>")
        );

        let prefs = f.handler.db().get(7).await.unwrap().unwrap();
        assert!(prefs.authenticated);
        assert_eq!(prefs.failed_auth, 0);
        assert_eq!(prefs.telegram_user.as_deref(), Some("alice"));
        assert_eq!(prefs.telegram_name.as_deref(), Some("Alice Liddell"));
    }

    #[tokio::test]
    async fn test_auth_without_password_shows_help() {
        let f = fixture().await;
        assert_eq!(say(&f, "/auth").await, Some(help_text("auth")));
        assert_eq!(f.handler.db().get(7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_repeated_failures_block_then_ignore() {
        let f = fixture().await;
        for _ in 0..11 {
            say(&f, "/auth wrong").await;
        }
        assert_eq!(say(&f, "/auth hunter2").await.as_deref(), Some("you are blocked"));
        for _ in 0..9 {
            say(&f, "/auth wrong").await;
        }
        assert_eq!(say(&f, "/auth hunter2").await, None);
    }

    #[tokio::test]
    async fn test_disable_enable_and_types() {
        let f = fixture().await;
        say(&f, "/auth hunter2").await;

        assert_eq!(
            say(&f, "/disable pu wu nope").await.as_deref(),
            Some("<pre>disabled : pu wu\nunknown types : nope</pre>")
        );
        let prefs = f.handler.db().get(7).await.unwrap().unwrap();
        assert!(!prefs.should_deliver("pu"));
        assert!(prefs.should_deliver("on"));

        let types = say(&f, "/types").await.unwrap();
        assert!(types.contains("pu              off position update"));
        assert!(types.contains("on              on  order placed"));
        assert!(!types.contains("hb "));

        say(&f, "/enable pu").await;
        let prefs = f.handler.db().get(7).await.unwrap().unwrap();
        assert_eq!(prefs.disabled_tags, vec!["wu"]);

        assert_eq!(say(&f, "/disable").await, Some(help_text("disable")));
    }

    #[tokio::test]
    async fn test_set_options() {
        let f = fixture().await;
        say(&f, "/auth hunter2").await;

        assert_eq!(
            say(&f, "/set defaultpair iotusd").await.as_deref(),
            Some("<pre>option defaultpair was set to iotusd</pre>")
        );
        assert_eq!(
            say(&f, "/set graphtheme dark").await.as_deref(),
            Some("<pre>graphtheme is not a valid option\nvalid options are defaultpair calctype</pre>")
        );
        assert_eq!(say(&f, "/set calctype").await, Some(help_text("set")));
        assert_eq!(
            say(&f, "/set defaultpair <b>").await.as_deref(),
            Some("<pre>incorrect value &lt;b&gt; for defaultpair</pre>")
        );

        let prefs = f.handler.db().get(7).await.unwrap().unwrap();
        assert_eq!(prefs.default_pair, "tIOTUSD");
    }

    #[tokio::test]
    async fn test_calc_uses_argument_or_default() {
        let f = fixture().await;
        say(&f, "/auth hunter2").await;

        assert_eq!(say(&f, "/calc").await, Some(help_text("calc")));
        say(&f, "/calc position_tIOTUSD").await;
        say(&f, "/set calctype margin_base").await;
        assert_eq!(
            say(&f, "/calc").await.as_deref(),
            Some("<pre>calc margin_base requested</pre>")
        );
        assert_eq!(say(&f, "/calc everything").await, Some(help_text("calc")));

        assert_eq!(
            *f.calcs.lock().unwrap(),
            vec![
                vec!["position_tIOTUSD".to_string()],
                vec!["margin_base".to_string()]
            ]
        );
    }

    #[test]
    fn test_help_text() {
        assert!(help_text("calc").contains("margin_sym_SYMBOL"));
        assert_eq!(help_text("/auth"), help_text("auth"));
        assert!(help_text("").contains("help is available for"));
    }
}
