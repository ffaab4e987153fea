//! Execution lifecycle.
//!
//! One invocation walks `Created → Parsed → Validated → Executed → Terminated`.
//! Two escapes exist: bad user input ends in `UsageError` with
//! [`exit_code::USAGE`], any other failure ends in `Failed` with whatever the
//! scope-resolved [`ExceptionHandler`](crate::ExceptionHandler) returns.
//!
//! Interruptions travel as an explicit [`Interrupt`] value from the step that
//! raised them to [`CommandInstance::run`], which is the single place an exit
//! code is decided.

use std::collections::BTreeMap;
use std::io::IsTerminal;

use anyhow::anyhow;

use crate::config::Settings;
use crate::context::{ExecutionContext, PathEntry};
use crate::error::InvariantViolation;
use crate::exit_code;
use crate::handler::resolve_exception_handler;
use crate::logging::CommandLogger;
use crate::option::{OptionMap, OptionValues, format_snapshot, redact_snapshot};
use crate::output::{OutputDefinition, OutputRenderer, interpolate};
use crate::parser::{ArgumentParser, ParseError, ParsedArguments};
use crate::tree::CommandNode;
use crate::validate::{ValidationOutcome, Validator};
use crate::Value;

/// What `execute` hands back to the lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// An exit code.
    Exit(i32),
    /// Any other value. Integers that fit an `i32` are accepted as exit
    /// codes; anything else reaching `run` is an [`InvariantViolation`].
    Value(Value),
}

impl From<i32> for Completion {
    fn from(code: i32) -> Self {
        Self::Exit(code)
    }
}

/// Behavior of one command type.
///
/// # Examples
///
/// ```
/// use cmdkit_core::*;
///
/// struct Hello;
///
/// impl Command for Hello {
///     fn execute(&mut self, cx: &mut CommandContext<'_>) -> anyhow::Result<Completion> {
///         let name = cx.option("name").and_then(Value::as_str).unwrap_or("world").to_string();
///         cx.print_message("Hello %{name}", &[("name", &name)]);
///         Ok(Completion::Exit(exit_code::OK))
///     }
/// }
///
/// let kind = CommandKind::builder("Hello")
///     .option(OptionDefinition::new(&["--name"], ValueType::String, "Who to greet"))
///     .implementation(|| Box::new(Hello))
///     .build()
///     .unwrap();
/// assert_eq!(kind.options().len(), 1);
/// ```
pub trait Command {
    /// Runs the command. The default does nothing and succeeds.
    fn execute(&mut self, _cx: &mut CommandContext<'_>) -> anyhow::Result<Completion> {
        Ok(Completion::Exit(exit_code::OK))
    }
}

/// Implementation used by command types that declare none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCommand;

impl Command for DefaultCommand {}

/// Where an invocation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Parsed,
    Validated,
    Executed,
    Terminated,
    UsageError,
    Failed,
}

/// Early exit from the lifecycle.
#[derive(Debug)]
pub enum Interrupt {
    /// Help was requested; carries the rendered text.
    Help(String),
    /// The user passed bad input.
    Usage(String),
    /// Anything else.
    Fault(anyhow::Error),
}

impl From<ParseError> for Interrupt {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Help(text) => Self::Help(text),
            ParseError::Usage(message) => Self::Usage(message),
        }
    }
}

impl Interrupt {
    fn check(outcome: ValidationOutcome) -> Result<(), Self> {
        match outcome {
            ValidationOutcome::Ok => Ok(()),
            ValidationOutcome::UsageError(message) => Err(Self::Usage(message)),
            ValidationOutcome::Fault(err) => Err(Self::Fault(err)),
        }
    }
}

/// Collaborators and shared state of one process invocation.
///
/// The [`ExecutionContext`] lives here and is never reset, so use one session
/// per invocation.
pub struct Session {
    parser: Box<dyn ArgumentParser>,
    renderer: Box<dyn OutputRenderer>,
    settings: Settings,
    context: ExecutionContext,
    interactive: bool,
}

impl Session {
    pub fn new(parser: impl ArgumentParser + 'static, renderer: impl OutputRenderer + 'static) -> Self {
        Self {
            parser: Box::new(parser),
            renderer: Box::new(renderer),
            settings: Settings::default(),
            context: ExecutionContext::new(),
            interactive: std::io::stdout().is_terminal(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Overrides terminal detection.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Runs the command tree rooted at `root` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation`] when a command's `execute` completes
    /// with something other than an exit code. Every other outcome,
    /// including usage errors and faults, is an `Ok` exit code.
    pub fn run(&mut self, root: &CommandNode, args: &[String]) -> Result<i32, InvariantViolation> {
        let mut instance = CommandInstance::new(root, &mut self.context);
        instance.run(self, args)
    }
}

/// One command on the invocation path.
pub struct CommandInstance<'n> {
    node: &'n CommandNode,
    values: OptionValues,
    implementation: Box<dyn Command>,
    logger: CommandLogger,
    state: LifecycleState,
    depth: usize,
}

impl<'n> CommandInstance<'n> {
    /// Instantiates `node` and appends it to the context path.
    pub fn new(node: &'n CommandNode, context: &mut ExecutionContext) -> Self {
        let kind = node.kind();
        let depth = context.push(PathEntry::new(node));
        Self {
            node,
            values: OptionValues::with_defaults(kind.options()),
            implementation: kind.instantiate(),
            logger: CommandLogger::for_kind(kind),
            state: LifecycleState::Created,
            depth,
        }
    }

    pub fn node(&self) -> &CommandNode {
        self.node
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Position on the context path; the root is 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn values(&self) -> &OptionValues {
        &self.values
    }

    /// Parses, validates and then either dispatches to a subcommand or
    /// executes.
    pub fn run(&mut self, session: &mut Session, args: &[String]) -> Result<i32, InvariantViolation> {
        let parsed = match self.prepare(session, args) {
            Ok(parsed) => parsed,
            Err(interrupt) => return Ok(self.interrupt(session, interrupt)),
        };

        match parsed.subcommand {
            Some(name) => self.dispatch(session, &name, &parsed.remaining),
            None => self.execute(session),
        }
    }

    fn prepare(&mut self, session: &mut Session, args: &[String]) -> Result<ParsedArguments, Interrupt> {
        let parsed = self.parse(session, args)?;
        self.validate(session)?;
        Ok(parsed)
    }

    fn parse(&mut self, session: &mut Session, args: &[String]) -> Result<ParsedArguments, Interrupt> {
        let parsed = session.parser.parse(self.node, args)?;
        let kind = self.node.kind();

        for (attribute, raw) in &parsed.values {
            let definition = kind.option(attribute).ok_or_else(|| {
                Interrupt::Fault(anyhow!(
                    "parser produced a value for undeclared option '{attribute}'"
                ))
            })?;
            definition
                .accessor()
                .write(&mut self.values, &mut session.context, raw.clone())
                .map_err(|err| Interrupt::Usage(err.to_string()))?;
        }

        if parsed.subcommand.is_none() && !self.node.children().is_empty() {
            return Err(Interrupt::Usage("no subcommand provided".to_string()));
        }

        self.state = LifecycleState::Parsed;
        Ok(parsed)
    }

    fn validate(&mut self, session: &Session) -> Result<(), Interrupt> {
        let kind = self.node.kind();
        let validator = Validator::from_values(kind.options(), &self.values);

        if let Err(err) = validator.check_required() {
            return Interrupt::check(err.into());
        }
        if let Some(block) = kind.validation_block() {
            Interrupt::check(validator.run(block))?;
        }
        self.state = LifecycleState::Validated;

        if session.settings.audit_options {
            let snapshot =
                redact_snapshot(&self.values.all_options(kind.options()), &session.settings);
            self.logger
                .info(&format!("Called with options: {}", format_snapshot(&snapshot)));
        }
        Ok(())
    }

    fn dispatch(&mut self, session: &mut Session, name: &str, args: &[String]) -> Result<i32, InvariantViolation> {
        let node = self.node;
        let Some(child) = node.find(name) else {
            let interrupt = Interrupt::Usage(format!("unknown subcommand '{name}'"));
            return Ok(self.interrupt(session, interrupt));
        };

        let mut instance = CommandInstance::new(child, &mut session.context);
        self.state = LifecycleState::Executed;
        let code = instance.run(session, args);
        self.state = match code {
            Ok(_) => LifecycleState::Terminated,
            Err(_) => LifecycleState::Failed,
        };
        code
    }

    fn execute(&mut self, session: &mut Session) -> Result<i32, InvariantViolation> {
        let mut cx = CommandContext {
            node: self.node,
            values: &self.values,
            logger: &self.logger,
            session: &mut *session,
        };
        let outcome = self.implementation.execute(&mut cx);
        self.state = LifecycleState::Executed;

        match outcome {
            Ok(Completion::Exit(code)) => {
                self.state = LifecycleState::Terminated;
                Ok(code)
            }
            Ok(Completion::Value(returned)) => {
                match returned.as_i64().and_then(|n| i32::try_from(n).ok()) {
                    Some(code) => {
                        self.state = LifecycleState::Terminated;
                        Ok(code)
                    }
                    None => {
                        self.state = LifecycleState::Failed;
                        Err(InvariantViolation {
                            command: self.node.kind().type_name().to_string(),
                            returned,
                        })
                    }
                }
            }
            Err(err) => Ok(self.interrupt(session, Interrupt::Fault(err))),
        }
    }

    fn interrupt(&mut self, session: &mut Session, interrupt: Interrupt) -> i32 {
        match interrupt {
            Interrupt::Help(text) => {
                self.state = LifecycleState::Terminated;
                session.renderer.print_message(&text);
                exit_code::OK
            }
            Interrupt::Usage(message) => {
                self.state = LifecycleState::UsageError;
                self.logger.debug(&format!("usage error: {message}"));
                let hint = self.usage_hint(session);
                session
                    .renderer
                    .print_error(&format!("Error: {message}\n\nSee: '{hint} --help'"));
                exit_code::USAGE
            }
            Interrupt::Fault(err) => {
                self.state = LifecycleState::Failed;
                let handler = resolve_exception_handler(&session.context.scope_chain(self.depth));
                handler.handle(&err, session.renderer.as_mut())
            }
        }
    }

    /// Program name followed by the invocation names below the root.
    fn usage_hint(&self, session: &Session) -> String {
        let mut words = vec![session.settings.program_name.as_str()];
        words.extend(
            session
                .context
                .path()
                .iter()
                .take(self.depth + 1)
                .skip(1)
                .map(|entry| entry.name.as_str()),
        );
        words.join(" ")
    }
}

/// What a running command sees.
pub struct CommandContext<'a> {
    node: &'a CommandNode,
    values: &'a OptionValues,
    logger: &'a CommandLogger,
    session: &'a mut Session,
}

impl CommandContext<'_> {
    /// Value of an option, by attribute name or switch.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.node
            .kind()
            .option(name)
            .and_then(|definition| definition.accessor().read(self.values))
    }

    /// Every declared option, unset ones included.
    pub fn all_options(&self) -> OptionMap {
        self.values.all_options(self.node.kind().options())
    }

    /// Options that hold a value.
    pub fn options(&self) -> BTreeMap<String, Value> {
        self.values.options(self.node.kind().options())
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.session.context
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.session.context
    }

    /// The command that dispatched to this one.
    pub fn parent_command(&self) -> Option<&PathEntry> {
        self.session.context.parent_command()
    }

    pub fn logger(&self) -> &CommandLogger {
        self.logger
    }

    pub fn output_definition(&self) -> &OutputDefinition {
        self.node.kind().output_definition()
    }

    pub fn print_record(&mut self, record: &Value) {
        let definition = self.node.kind().output_definition();
        self.session.renderer.print_record(definition, record);
    }

    pub fn print_collection(&mut self, records: &[Value]) {
        let definition = self.node.kind().output_definition();
        self.session.renderer.print_collection(definition, records);
    }

    /// Prints `message` with `%{name}` placeholders filled from `params`.
    pub fn print_message(&mut self, message: &str, params: &[(&str, &str)]) {
        self.session.renderer.print_message(&interpolate(message, params));
    }

    pub fn interactive(&self) -> bool {
        self.session.interactive
    }

    pub fn settings(&self) -> &Settings {
        &self.session.settings
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::handler::{ExceptionHandler, Scope};
    use crate::option::OptionDefinition;
    use crate::output::FieldType;
    use crate::validate::ValidationError;
    use crate::{CommandKind, ValueType};

    /// Understands `--switch=value`, bare `--flag`, `--help` and a first bare
    /// word as the subcommand.
    struct ScriptedParser;

    impl ArgumentParser for ScriptedParser {
        fn parse(&self, node: &CommandNode, args: &[String]) -> Result<ParsedArguments, ParseError> {
            let mut parsed = ParsedArguments::default();
            let mut iter = args.iter();
            while let Some(arg) = iter.next() {
                if arg == "--help" {
                    return Err(ParseError::Help(format!("Usage: {}", node.name())));
                }
                if !arg.starts_with('-') {
                    let child = node
                        .find(arg)
                        .map(|c| c.name().to_string())
                        .unwrap_or_else(|| arg.clone());
                    parsed.subcommand = Some(child);
                    parsed.remaining = iter.cloned().collect();
                    break;
                }
                let (switch, raw) = match arg.split_once('=') {
                    Some((switch, raw)) => (switch, Value::from(raw)),
                    None => (arg.as_str(), Value::Bool(true)),
                };
                let definition = node
                    .kind()
                    .option(switch)
                    .ok_or_else(|| ParseError::Usage(format!("Unrecognised option '{switch}'")))?;
                parsed
                    .values
                    .push((definition.attribute_name().to_string(), raw));
            }
            Ok(parsed)
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        lines: Rc<RefCell<Vec<String>>>,
    }

    impl Recorder {
        fn lines(&self) -> Vec<String> {
            self.lines.borrow().clone()
        }
    }

    impl OutputRenderer for Recorder {
        fn print_record(&mut self, definition: &OutputDefinition, record: &Value) {
            let cells: Vec<String> = definition
                .fields()
                .iter()
                .map(|f| format!("{}={}", f.label, record[&f.key]))
                .collect();
            self.lines.borrow_mut().push(cells.join(" "));
        }

        fn print_collection(&mut self, definition: &OutputDefinition, records: &[Value]) {
            for record in records {
                self.print_record(definition, record);
            }
        }

        fn print_message(&mut self, message: &str) {
            self.lines.borrow_mut().push(message.to_string());
        }

        fn print_error(&mut self, message: &str) {
            self.lines.borrow_mut().push(format!("stderr: {message}"));
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = Captured::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (result, logs)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn session(recorder: &Recorder) -> Session {
        Session::new(ScriptedParser, recorder.clone()).with_interactive(false)
    }

    struct Returns(Completion);

    impl Command for Returns {
        fn execute(&mut self, _cx: &mut CommandContext<'_>) -> anyhow::Result<Completion> {
            Ok(self.0.clone())
        }
    }

    struct Fails;

    impl Command for Fails {
        fn execute(&mut self, _cx: &mut CommandContext<'_>) -> anyhow::Result<Completion> {
            Err(anyhow!("backend unreachable"))
        }
    }

    struct FixedCode(i32);

    impl ExceptionHandler for FixedCode {
        fn handle(&self, _error: &anyhow::Error, _output: &mut dyn OutputRenderer) -> i32 {
            self.0
        }
    }

    struct ShowOptions;

    impl Command for ShowOptions {
        fn execute(&mut self, cx: &mut CommandContext<'_>) -> anyhow::Result<Completion> {
            let password = cx.options()["password"].as_str().unwrap_or_default().to_string();
            cx.print_message("password is %{password}", &[("password", &password)]);
            let all = cx.all_options();
            cx.print_message(&format!("declared {}", all.len()), &[]);
            Ok(Completion::Exit(exit_code::OK))
        }
    }

    fn create_kind() -> Arc<CommandKind> {
        CommandKind::builder("UserCreate")
            .option(OptionDefinition::new(&["--login"], ValueType::String, "Login").required())
            .option(OptionDefinition::new(&["--password"], ValueType::String, "Password"))
            .option(OptionDefinition::new(&["--email"], ValueType::String, "Email"))
            .implementation(|| Box::new(ShowOptions))
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_execute_succeeds() {
        let recorder = Recorder::default();
        let root = CommandNode::new("tool", "", CommandKind::builder("Tool").build().unwrap());
        let code = session(&recorder).run(&root, &[]).unwrap();
        assert_eq!(code, exit_code::OK);
    }

    #[test]
    fn test_password_is_masked_in_audit_log_only() {
        let recorder = Recorder::default();
        let root = CommandNode::new("create", "", create_kind());
        let argv = args(&["--login=admin", "--password=secret123"]);

        let (code, logs) = capture_logs(|| session(&recorder).run(&root, &argv));

        assert_eq!(code.unwrap(), exit_code::OK);
        assert!(logs.contains("Called with options: {email => unset, login => admin, password => ***}"));
        assert!(!logs.contains("secret123"));
        assert_eq!(recorder.lines(), vec!["password is secret123", "declared 3"]);
    }

    #[test]
    fn test_audit_log_can_be_disabled() {
        let recorder = Recorder::default();
        let root = CommandNode::new("create", "", create_kind());
        let settings = Settings {
            audit_options: false,
            ..Settings::default()
        };
        let argv = args(&["--login=admin"]);

        let (_, logs) = capture_logs(|| session(&recorder).with_settings(settings).run(&root, &argv));
        assert!(!logs.contains("Called with options"));
    }

    #[test]
    fn test_missing_required_option_is_usage_error() {
        let recorder = Recorder::default();
        let tool = CommandKind::builder("Tool")
            .subcommand("create", "Create a user", create_kind())
            .unwrap()
            .build()
            .unwrap();
        let root = CommandNode::new("tool", "", tool);

        let code = session(&recorder).run(&root, &args(&["create"])).unwrap();

        assert_eq!(code, exit_code::USAGE);
        assert_eq!(
            recorder.lines(),
            vec!["stderr: Error: Missing arguments for --login.\n\nSee: 'cmdkit create --help'"]
        );
    }

    #[test]
    fn test_validation_block_failure_yields_usage_code() {
        let recorder = Recorder::default();
        let kind = CommandKind::builder("Info")
            .option(OptionDefinition::new(&["--id"], ValueType::Number, "Id"))
            .option(OptionDefinition::new(&["--name"], ValueType::String, "Name"))
            .validate_options(|v| v.any(&["--id", "--name"]).required())
            .exception_handler(Arc::new(FixedCode(99)))
            .build()
            .unwrap();
        let root = CommandNode::new("info", "", kind);

        let code = session(&recorder).run(&root, &[]).unwrap();
        assert_eq!(code, exit_code::USAGE);
    }

    #[test]
    fn test_unknown_option_in_block_is_a_fault() {
        let recorder = Recorder::default();
        let kind = CommandKind::builder("Info")
            .validate_options(|v| v.option("--nope").required())
            .exception_handler(Arc::new(FixedCode(99)))
            .build()
            .unwrap();
        let root = CommandNode::new("info", "", kind);

        let code = session(&recorder).run(&root, &[]).unwrap();
        assert_eq!(code, 99);
    }

    #[test]
    fn test_custom_validation_message() {
        let recorder = Recorder::default();
        let kind = CommandKind::builder("Info")
            .validate_options(|_| Err(ValidationError::Invalid("try again".into())))
            .build()
            .unwrap();
        let root = CommandNode::new("info", "", kind);

        let mut session = session(&recorder);
        assert_eq!(session.run(&root, &[]).unwrap(), exit_code::USAGE);
        assert!(recorder.lines()[0].starts_with("stderr: Error: try again"));
    }

    #[test]
    fn test_conversion_failure_is_usage_error() {
        let recorder = Recorder::default();
        let kind = CommandKind::builder("Info")
            .option(OptionDefinition::new(&["--id"], ValueType::Number, "Id"))
            .build()
            .unwrap();
        let root = CommandNode::new("info", "", kind);

        let code = session(&recorder).run(&root, &args(&["--id=abc"])).unwrap();
        assert_eq!(code, exit_code::USAGE);
        assert!(recorder.lines()[0].contains("option --id: numeric value is required"));
    }

    #[test]
    fn test_non_integer_completion_is_invariant_violation() {
        let recorder = Recorder::default();
        let kind = CommandKind::builder("Broken")
            .implementation(|| Box::new(Returns(Completion::Value(Value::from("ok")))))
            .build()
            .unwrap();
        let root = CommandNode::new("broken", "", kind);

        let err = session(&recorder).run(&root, &[]).unwrap_err();
        assert_eq!(err.command, "Broken");
        assert_eq!(err.returned, Value::from("ok"));
        assert!(recorder.lines().is_empty());
    }

    #[test]
    fn test_integer_value_completion_is_an_exit_code() {
        let recorder = Recorder::default();
        for (returned, expected) in [(Value::from(0), exit_code::OK), (Value::from(7), 7)] {
            let kind = CommandKind::builder("Plain")
                .implementation(move || Box::new(Returns(Completion::Value(returned.clone()))))
                .build()
                .unwrap();
            let root = CommandNode::new("plain", "", kind);
            assert_eq!(session(&recorder).run(&root, &[]).unwrap(), expected);
        }
    }

    #[test]
    fn test_out_of_range_or_fractional_value_is_invariant_violation() {
        let recorder = Recorder::default();
        for returned in [Value::from(i64::from(i32::MAX) + 1), Value::from(1.5)] {
            let expected = returned.clone();
            let kind = CommandKind::builder("Broken")
                .implementation(move || Box::new(Returns(Completion::Value(returned.clone()))))
                .build()
                .unwrap();
            let root = CommandNode::new("broken", "", kind);

            let err = session(&recorder).run(&root, &[]).unwrap_err();
            assert_eq!(err.returned, expected);
        }
    }

    #[test]
    fn test_extra_redacted_suffixes_keep_password_masked() {
        let recorder = Recorder::default();
        let root = CommandNode::new("create", "", create_kind());
        let settings = Settings::from_yaml_str("redacted_suffixes:\n  - token\n").unwrap();
        let argv = args(&["--login=admin", "--password=secret123"]);

        let (code, logs) =
            capture_logs(|| session(&recorder).with_settings(settings).run(&root, &argv));

        assert_eq!(code.unwrap(), exit_code::OK);
        assert!(logs.contains("password => ***"));
        assert!(!logs.contains("secret123"));
    }

    #[test]
    fn test_instance_state_tracks_outcome() {
        let recorder = Recorder::default();
        let root = CommandNode::new("create", "", create_kind());
        let mut session = session(&recorder);

        let mut ok = CommandInstance::new(&root, &mut ExecutionContext::new());
        assert_eq!(ok.state(), LifecycleState::Created);
        ok.run(&mut session, &args(&["--login=admin", "--password=x"])).unwrap();
        assert_eq!(ok.state(), LifecycleState::Terminated);

        let mut bad = CommandInstance::new(&root, &mut ExecutionContext::new());
        bad.run(&mut session, &[]).unwrap();
        assert_eq!(bad.state(), LifecycleState::UsageError);
        assert!(bad.values().get("login").is_none());
    }

    #[test]
    fn test_exit_code_from_execute_is_returned() {
        let recorder = Recorder::default();
        let kind = CommandKind::builder("Custom")
            .implementation(|| Box::new(Returns(Completion::from(3))))
            .build()
            .unwrap();
        let root = CommandNode::new("custom", "", kind);

        assert_eq!(session(&recorder).run(&root, &[]).unwrap(), 3);
    }

    #[test]
    fn test_fault_goes_to_nearest_scope_handler() {
        let recorder = Recorder::default();
        let list = CommandKind::builder("UserList")
            .within(Scope::new("plugin").with_exception_handler(Arc::new(FixedCode(4))))
            .within(Scope::new("user"))
            .implementation(|| Box::new(Fails))
            .build()
            .unwrap();
        let tool = CommandKind::builder("Tool")
            .exception_handler(Arc::new(FixedCode(1)))
            .subcommand("list", "", list)
            .unwrap()
            .build()
            .unwrap();
        let root = CommandNode::new("tool", "", tool);

        let code = session(&recorder).run(&root, &args(&["list"])).unwrap();
        assert_eq!(code, 4);
    }

    #[test]
    fn test_fault_without_handlers_uses_default() {
        let recorder = Recorder::default();
        let kind = CommandKind::builder("Fails")
            .implementation(|| Box::new(Fails))
            .build()
            .unwrap();
        let root = CommandNode::new("fails", "", kind);

        let code = session(&recorder).run(&root, &[]).unwrap();
        assert_eq!(code, exit_code::SOFTWARE);
        assert_eq!(recorder.lines(), vec!["stderr: Error: backend unreachable"]);
    }

    #[test]
    fn test_help_prints_and_succeeds() {
        let recorder = Recorder::default();
        let root = CommandNode::new("create", "", create_kind());

        let code = session(&recorder).run(&root, &args(&["--help"])).unwrap();
        assert_eq!(code, exit_code::OK);
        assert_eq!(recorder.lines(), vec!["Usage: create"]);
    }

    #[test]
    fn test_group_without_subcommand_is_usage_error() {
        let recorder = Recorder::default();
        let tool = CommandKind::builder("Tool")
            .subcommand("create", "", create_kind())
            .unwrap()
            .build()
            .unwrap();
        let root = CommandNode::new("tool", "", tool);

        assert_eq!(session(&recorder).run(&root, &[]).unwrap(), exit_code::USAGE);
        assert_eq!(session(&recorder).run(&root, &args(&["delete"])).unwrap(), exit_code::USAGE);
        assert!(recorder.lines()[1].contains("unknown subcommand 'delete'"));
    }

    struct PrintParent;

    impl Command for PrintParent {
        fn execute(&mut self, cx: &mut CommandContext<'_>) -> anyhow::Result<Completion> {
            let parent = cx.parent_command().map(|p| p.name.clone()).unwrap_or_default();
            cx.print_message("parent: %{parent}", &[("parent", &parent)]);
            cx.print_record(&serde_json::json!({"id": 1}));
            Ok(Completion::Exit(exit_code::OK))
        }
    }

    #[test]
    fn test_dispatch_builds_path_and_context_targets() {
        let recorder = Recorder::default();

        let mut root = CommandNode::new(
            "tool",
            "",
            CommandKind::builder("Tool")
                .option(
                    OptionDefinition::new(&["--organization-id"], ValueType::Number, "Organization")
                        .with_context_target("organization_id"),
                )
                .build()
                .unwrap(),
        );
        let user = root
            .register("user", "", CommandKind::builder("User").build().unwrap())
            .unwrap();
        let list = CommandKind::builder("UserList")
            .output(|dsl| {
                dsl.field("id", "Id", FieldType::Id);
            })
            .implementation(|| Box::new(PrintParent))
            .build()
            .unwrap();
        user.register("list", "", list).unwrap();

        let mut session = session(&recorder);
        let code = session
            .run(&root, &args(&["--organization-id=5", "user", "list"]))
            .unwrap();

        assert_eq!(code, exit_code::OK);
        assert_eq!(recorder.lines(), vec!["parent: user", "Id=1"]);
        assert_eq!(session.context().command_line(), vec!["tool", "user", "list"]);
        assert_eq!(session.context().get("organization_id"), Some(&Value::from(5)));
    }
}
