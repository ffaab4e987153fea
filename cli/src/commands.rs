//! Demo command tree: `user list|create|info` over a fixed in-memory store.

use std::sync::Arc;

use anyhow::Result;
use cmdkit_core::{
    Command, CommandContext, CommandKind, CommandNode, Completion, DefaultExceptionHandler,
    ExceptionHandler, FieldType, Namespace, OptionDefinition, OutputRenderer, Scope, Value,
    ValueType, exit_code,
};
use serde::Serialize;
use thiserror::Error;

/// sysexits `EX_NOUSER`.
pub const NO_USER: i32 = 67;

#[derive(Debug, Clone, Serialize)]
struct User {
    id: u64,
    login: &'static str,
    email: &'static str,
    organization_id: u64,
    roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize)]
struct Role {
    name: &'static str,
}

fn users() -> Vec<User> {
    vec![
        User {
            id: 1,
            login: "admin",
            email: "admin@example.com",
            organization_id: 1,
            roles: vec![Role { name: "Administrator" }],
        },
        User {
            id: 2,
            login: "jdoe",
            email: "jdoe@example.com",
            organization_id: 2,
            roles: vec![Role { name: "Viewer" }, Role { name: "Reporter" }],
        },
    ]
}

#[derive(Debug, Error)]
#[error("user {0} not found")]
pub struct UserNotFound(pub String);

/// Reports missing users with their own exit code; everything else goes to
/// the default handler.
struct UserPluginHandler;

impl ExceptionHandler for UserPluginHandler {
    fn handle(&self, error: &anyhow::Error, output: &mut dyn OutputRenderer) -> i32 {
        match error.downcast_ref::<UserNotFound>() {
            Some(err) => {
                output.print_error(&format!("Error: {err}"));
                NO_USER
            }
            None => DefaultExceptionHandler.handle(error, output),
        }
    }
}

fn organization_filter(cx: &CommandContext<'_>) -> Option<u64> {
    cx.context().get("organization_id").and_then(Value::as_u64)
}

struct ListUsers;

impl Command for ListUsers {
    fn execute(&mut self, cx: &mut CommandContext<'_>) -> Result<Completion> {
        let search = cx.option("search").and_then(Value::as_str).map(str::to_string);
        let organization = organization_filter(cx);
        cx.logger().watch("organization filter", &organization);

        let records = users()
            .into_iter()
            .filter(|u| organization.is_none_or(|id| u.organization_id == id))
            .filter(|u| search.as_deref().is_none_or(|s| u.login.contains(s)))
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        cx.print_collection(&records);
        Ok(Completion::Exit(exit_code::OK))
    }
}

struct CreateUser;

impl Command for CreateUser {
    fn execute(&mut self, cx: &mut CommandContext<'_>) -> Result<Completion> {
        let login = cx
            .option("login")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if users().iter().any(|u| u.login == login) {
            anyhow::bail!("login {login} is already taken");
        }
        cx.logger().debug(&format!("creating user {login}"));
        cx.print_message("User %{login} created.", &[("login", &login)]);
        Ok(Completion::Exit(exit_code::OK))
    }
}

struct ShowUser;

impl Command for ShowUser {
    fn execute(&mut self, cx: &mut CommandContext<'_>) -> Result<Completion> {
        let id = cx.option("id").and_then(Value::as_u64);
        let login = cx.option("login").and_then(Value::as_str).map(str::to_string);

        let user = users()
            .into_iter()
            .find(|u| Some(u.id) == id || login.as_deref() == Some(u.login))
            .ok_or_else(|| {
                UserNotFound(id.map(|i| i.to_string()).or(login).unwrap_or_default())
            })?;

        cx.print_record(&serde_json::to_value(user)?);
        Ok(Completion::Exit(exit_code::OK))
    }
}

fn plugin_scope() -> Scope {
    Scope::new("user_plugin").with_exception_handler(Arc::new(UserPluginHandler))
}

/// Shared base of the `user` commands: the `id`/`login` output columns.
fn user_base() -> cmdkit_core::Result<Arc<CommandKind>> {
    CommandKind::builder("UserCommand")
        .output(|dsl| {
            dsl.field("id", "Id", FieldType::Id)
                .field("login", "Login", FieldType::Text);
        })
        .build()
}

fn user_commands() -> cmdkit_core::Result<Namespace> {
    let base = user_base()?;

    let list = CommandKind::builder("UserList")
        .extends(&base)
        .command_name("list")
        .description("List users")
        .within(plugin_scope())
        .option(OptionDefinition::new(&["-s", "--search"], ValueType::String, "Filter by login"))
        .output(|dsl| {
            dsl.field("email", "Email", FieldType::Text);
        })
        .implementation(|| Box::new(ListUsers))
        .build()?;

    let create = CommandKind::builder("UserCreate")
        .command_name("create")
        .description("Create a user")
        .within(plugin_scope())
        .option(OptionDefinition::new(&["--login"], ValueType::String, "Login name").required())
        .option(OptionDefinition::new(&["--password"], ValueType::String, "Password"))
        .option(OptionDefinition::new(&["--email"], ValueType::String, "Email address"))
        .option(
            OptionDefinition::new(&["--admin"], ValueType::Boolean, "Grant administrator role")
                .with_default(false)
                .with_formatter(|v| String::from(if v.as_bool() == Some(true) { "yes" } else { "no" })),
        )
        .implementation(|| Box::new(CreateUser))
        .build()?;

    let info = CommandKind::builder("UserInfo")
        .extends(&base)
        .command_name("info")
        .description("Show a user")
        .within(plugin_scope())
        .option(OptionDefinition::new(&["--id"], ValueType::Number, "User id"))
        .option(OptionDefinition::new(&["--login"], ValueType::String, "Login name"))
        .validate_options(|v| v.one_of(&["--id", "--login"]).required())
        .output(|dsl| {
            dsl.field("email", "Email", FieldType::Text)
                .collection("roles", "Roles", |roles| {
                    roles.field("name", "Name", FieldType::Text);
                });
        })
        .implementation(|| Box::new(ShowUser))
        .build()?;

    let mut namespace = Namespace::new("user");
    namespace.push(list).push(create).push(info);
    Ok(namespace)
}

/// Builds the full demo tree under `program_name`.
pub fn tree(program_name: &str) -> cmdkit_core::Result<CommandNode> {
    let user = CommandKind::builder("User")
        .description("Manage users")
        .autoload(&user_commands()?)?
        .build()?;

    let tool = CommandKind::builder("Tool")
        .option(
            OptionDefinition::new(&["--organization-id"], ValueType::Number, "Organization to work in")
                .with_context_target("organization_id"),
        )
        .build()?;

    let mut root = CommandNode::new(program_name, "cmdkit demo tool", tool);
    root.register("user", "Manage users", user)?
        .add_alias("users");
    Ok(root)
}
