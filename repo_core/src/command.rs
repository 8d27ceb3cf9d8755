//! Raw command surface
//!
//! `RawCommand` carries an arbitrary parameterized command (SQL text or a
//! stored routine name) together with its parameter descriptors, behavior
//! and timeout. `ParameterBinder` collapses the two parameter-declaration
//! styles (plain name→value pairs, and direction/size/type-annotated
//! descriptors) into one internal shape.
//!
//! Text commands reference parameters as `@name`; rendering rewrites each
//! distinct name to the next `$n` placeholder in first-occurrence order.
//! Procedure commands hold a bare routine name and render as
//! `SELECT * FROM name($1..$n)` over the input parameters in declaration
//! order.

use crate::errors::RepoError;
use entity_mapping::DbType;
use serde_json::Value;

/// How the command text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Parameterized SQL text with `@name` markers
    Text,
    /// Name of a stored routine
    Procedure,
}

/// Row-cursor behavior for reader execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBehavior {
    /// Walk every row of the result
    Default,
    /// Stop after the first row
    SingleRow,
}

/// Direction of a command parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterDirection {
    In,
    Out,
    InOut,
    Return,
}

impl ParameterDirection {
    /// Whether a parameter in this direction carries a value into the command
    pub fn is_input(self) -> bool {
        matches!(self, ParameterDirection::In | ParameterDirection::InOut)
    }
}

/// One fully described command parameter
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    pub name: String,
    pub value: Value,
    pub direction: ParameterDirection,
    pub db_type: Option<DbType>,
    pub size: Option<i32>,
}

impl ParameterDescriptor {
    /// An input parameter with inferred typing
    pub fn input(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            direction: ParameterDirection::In,
            db_type: None,
            size: None,
        }
    }

    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_db_type(mut self, db_type: DbType) -> Self {
        self.db_type = Some(db_type);
        self
    }

    pub fn with_size(mut self, size: i32) -> Self {
        self.size = Some(size);
        self
    }
}

/// The two accepted parameter-declaration styles
#[derive(Debug, Clone)]
pub enum CommandParams {
    /// Plain name→value pairs; each becomes an In-direction descriptor
    Named(Vec<(String, Value)>),
    /// Explicit descriptors, used verbatim
    Descriptors(Vec<ParameterDescriptor>),
}

/// Normalizes parameter declarations onto a command
pub struct ParameterBinder;

impl ParameterBinder {
    /// Attach parameters to a command.
    ///
    /// Empty containers are a caller error, not a no-op.
    pub fn bind(command: &mut RawCommand, params: CommandParams) -> Result<(), RepoError> {
        match params {
            CommandParams::Named(entries) => {
                if entries.is_empty() {
                    return Err(RepoError::InvalidArgument(
                        "the parameter map can't be empty".to_string(),
                    ));
                }
                for (name, value) in entries {
                    command.params.push(ParameterDescriptor::input(name, value));
                }
            }
            CommandParams::Descriptors(descriptors) => {
                if descriptors.is_empty() {
                    return Err(RepoError::InvalidArgument(
                        "the parameter list can't be empty".to_string(),
                    ));
                }
                command.params.extend(descriptors);
            }
        }
        Ok(())
    }
}

/// A parameterized raw command
#[derive(Debug, Clone)]
pub struct RawCommand {
    sql: String,
    kind: CommandKind,
    behavior: CommandBehavior,
    timeout_millis: Option<u64>,
    params: Vec<ParameterDescriptor>,
}

/// A command rendered to executable form: `$n` SQL plus ordered input values
#[derive(Debug)]
pub(crate) struct PreparedCommand {
    pub sql: String,
    pub values: Vec<(Value, Option<DbType>)>,
}

impl RawCommand {
    /// A SQL-text command
    pub fn text(sql: impl Into<String>) -> Result<Self, RepoError> {
        let sql = sql.into();
        if sql.trim().is_empty() {
            return Err(RepoError::InvalidArgument(
                "command text can't be empty".to_string(),
            ));
        }
        Ok(Self {
            sql,
            kind: CommandKind::Text,
            behavior: CommandBehavior::Default,
            timeout_millis: None,
            params: Vec::new(),
        })
    }

    /// A stored-routine command
    pub fn procedure(name: impl Into<String>) -> Result<Self, RepoError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RepoError::InvalidArgument(
                "routine name can't be empty".to_string(),
            ));
        }
        if name.chars().any(|c| c.is_whitespace() || c == '(' || c == ')') {
            return Err(RepoError::InvalidArgument(format!(
                "'{}' is not a routine name",
                name
            )));
        }
        Ok(Self {
            sql: name,
            kind: CommandKind::Procedure,
            behavior: CommandBehavior::Default,
            timeout_millis: None,
            params: Vec::new(),
        })
    }

    /// Attach parameters in either declaration style
    pub fn with_params(mut self, params: CommandParams) -> Result<Self, RepoError> {
        ParameterBinder::bind(&mut self, params)?;
        Ok(self)
    }

    pub fn with_behavior(mut self, behavior: CommandBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Command-level timeout; a configuration value carried to the session,
    /// not a cancellation mechanism
    pub fn with_timeout_millis(mut self, millis: u64) -> Self {
        self.timeout_millis = Some(millis);
        self
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn behavior(&self) -> CommandBehavior {
        self.behavior
    }

    pub fn timeout_millis(&self) -> Option<u64> {
        self.timeout_millis
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.params
    }

    /// Render to placeholder SQL and ordered input values
    pub(crate) fn render(&self) -> Result<PreparedCommand, RepoError> {
        match self.kind {
            CommandKind::Text => self.render_text(),
            CommandKind::Procedure => self.render_procedure(),
        }
    }

    fn render_text(&self) -> Result<PreparedCommand, RepoError> {
        let (sql, references) = rewrite_references(&self.sql);

        // Every referenced name needs an input descriptor, every input
        // descriptor needs a reference; either mismatch hides a caller bug.
        for name in &references {
            if !self
                .params
                .iter()
                .any(|p| p.direction.is_input() && p.name == *name)
            {
                return Err(RepoError::InvalidArgument(format!(
                    "command references parameter '@{}' but no input value was supplied",
                    name
                )));
            }
        }
        for param in self.params.iter().filter(|p| p.direction.is_input()) {
            if !references.contains(&param.name) {
                return Err(RepoError::InvalidArgument(format!(
                    "parameter '{}' is never referenced by the command",
                    param.name
                )));
            }
        }

        let mut values = Vec::with_capacity(references.len());
        for name in &references {
            let descriptor = self
                .params
                .iter()
                .find(|p| p.direction.is_input() && p.name == *name)
                .ok_or_else(|| {
                    RepoError::InvalidArgument(format!("missing parameter '{}'", name))
                })?;
            values.push((descriptor.value.clone(), descriptor.db_type));
        }

        Ok(PreparedCommand { sql, values })
    }

    fn render_procedure(&self) -> Result<PreparedCommand, RepoError> {
        let inputs: Vec<&ParameterDescriptor> = self
            .params
            .iter()
            .filter(|p| p.direction.is_input())
            .collect();

        let placeholders: Vec<String> = (1..=inputs.len()).map(|i| format!("${}", i)).collect();
        let sql = format!("SELECT * FROM {}({})", self.sql, placeholders.join(", "));
        let values = inputs
            .iter()
            .map(|p| (p.value.clone(), p.db_type))
            .collect();

        Ok(PreparedCommand { sql, values })
    }
}

/// Rewrite `@name` references to `$n` placeholders in one pass.
///
/// Returns the rewritten SQL and the distinct names in first-occurrence
/// order (which is the placeholder numbering). A reference is `@` followed
/// by an identifier; `@@` and `@` inside quoted strings are left alone.
fn rewrite_references(sql: &str) -> (String, Vec<String>) {
    let mut names: Vec<String> = Vec::new();
    let mut rewritten = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if c == '\'' {
            in_string = !in_string;
            rewritten.push(c);
            continue;
        }
        if in_string {
            rewritten.push(c);
            continue;
        }
        if c == '@' {
            if chars.peek() == Some(&'@') {
                chars.next();
                rewritten.push_str("@@");
                continue;
            }

            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }

            if name.is_empty() {
                rewritten.push('@');
                continue;
            }

            let position = match names.iter().position(|n| *n == name) {
                Some(position) => position,
                None => {
                    names.push(name);
                    names.len() - 1
                }
            };
            rewritten.push('$');
            rewritten.push_str(&(position + 1).to_string());
            continue;
        }
        rewritten.push(c);
    }

    (rewritten, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn named_params_become_input_descriptors() {
        let command = RawCommand::text("SELECT * FROM items WHERE id = @id AND status = @status")
            .expect("valid text")
            .with_params(CommandParams::Named(vec![
                ("id".to_string(), json!(7)),
                ("status".to_string(), json!("open")),
            ]))
            .expect("valid params");

        assert_eq!(command.parameters().len(), 2);
        assert!(command
            .parameters()
            .iter()
            .all(|p| p.direction == ParameterDirection::In));
    }

    #[test]
    fn descriptors_are_used_verbatim() {
        let command = RawCommand::procedure("allocate_stock")
            .expect("valid routine")
            .with_params(CommandParams::Descriptors(vec![
                ParameterDescriptor::input("quantity", json!(3))
                    .with_db_type(DbType::Int4)
                    .with_size(4),
                ParameterDescriptor::input("allocated", Value::Null)
                    .with_direction(ParameterDirection::Out),
            ]))
            .expect("valid params");

        let params = command.parameters();
        assert_eq!(params[0].db_type, Some(DbType::Int4));
        assert_eq!(params[0].size, Some(4));
        assert_eq!(params[1].direction, ParameterDirection::Out);
    }

    #[test]
    fn empty_parameter_containers_are_rejected() {
        let mut command = RawCommand::text("SELECT 1").expect("valid text");

        assert!(matches!(
            ParameterBinder::bind(&mut command, CommandParams::Named(vec![])),
            Err(RepoError::InvalidArgument(_))
        ));
        assert!(matches!(
            ParameterBinder::bind(&mut command, CommandParams::Descriptors(vec![])),
            Err(RepoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn blank_command_text_is_rejected() {
        assert!(matches!(
            RawCommand::text("   "),
            Err(RepoError::InvalidArgument(_))
        ));
        assert!(matches!(
            RawCommand::procedure("not a name"),
            Err(RepoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn text_rendering_numbers_by_first_occurrence() {
        let command = RawCommand::text(
            "SELECT * FROM items WHERE status = @status AND (owner = @owner OR reviewer = @owner)",
        )
        .expect("valid text")
        .with_params(CommandParams::Named(vec![
            ("owner".to_string(), json!("ada")),
            ("status".to_string(), json!("open")),
        ]))
        .expect("valid params");

        let prepared = command.render().expect("renders");
        assert_eq!(
            prepared.sql,
            "SELECT * FROM items WHERE status = $1 AND (owner = $2 OR reviewer = $2)"
        );
        // values follow placeholder order, not declaration order
        assert_eq!(prepared.values[0].0, json!("open"));
        assert_eq!(prepared.values[1].0, json!("ada"));
    }

    #[test]
    fn unreferenced_and_undeclared_parameters_are_errors() {
        let command = RawCommand::text("SELECT * FROM items WHERE id = @id")
            .expect("valid text")
            .with_params(CommandParams::Named(vec![
                ("id".to_string(), json!(1)),
                ("ghost".to_string(), json!(2)),
            ]))
            .expect("valid params");
        assert!(matches!(
            command.render(),
            Err(RepoError::InvalidArgument(_))
        ));

        let command = RawCommand::text("SELECT * FROM items WHERE id = @id").expect("valid text");
        assert!(matches!(
            command.render(),
            Err(RepoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn references_inside_string_literals_are_ignored() {
        let command = RawCommand::text("SELECT '@not_a_param', id FROM items WHERE id = @id")
            .expect("valid text")
            .with_params(CommandParams::Named(vec![("id".to_string(), json!(1))]))
            .expect("valid params");

        let prepared = command.render().expect("renders");
        assert!(prepared.sql.contains("'@not_a_param'"));
        assert!(prepared.sql.contains("id = $1"));
        assert_eq!(prepared.values.len(), 1);
    }

    #[test]
    fn procedure_rendering_uses_declaration_order() {
        let command = RawCommand::procedure("reorder_items")
            .expect("valid routine")
            .with_params(CommandParams::Descriptors(vec![
                ParameterDescriptor::input("warehouse", json!("north")),
                ParameterDescriptor::input("result", Value::Null)
                    .with_direction(ParameterDirection::Return),
                ParameterDescriptor::input("threshold", json!(10)),
            ]))
            .expect("valid params");

        let prepared = command.render().expect("renders");
        // Out/Return descriptors bind no value
        assert_eq!(prepared.sql, "SELECT * FROM reorder_items($1, $2)");
        assert_eq!(prepared.values.len(), 2);
        assert_eq!(prepared.values[0].0, json!("north"));
        assert_eq!(prepared.values[1].0, json!(10));
    }

    #[test]
    fn prefixed_parameter_names_do_not_collide() {
        let command = RawCommand::text("UPDATE items SET owner = @owner WHERE id = @owner_id")
            .expect("valid text")
            .with_params(CommandParams::Named(vec![
                ("owner".to_string(), json!("ada")),
                ("owner_id".to_string(), json!(9)),
            ]))
            .expect("valid params");

        let prepared = command.render().expect("renders");
        assert_eq!(
            prepared.sql,
            "UPDATE items SET owner = $1 WHERE id = $2"
        );
    }

    #[test]
    fn procedure_without_params_renders_empty_argument_list() {
        let command = RawCommand::procedure("refresh_totals").expect("valid routine");
        let prepared = command.render().expect("renders");
        assert_eq!(prepared.sql, "SELECT * FROM refresh_totals()");
    }
}
