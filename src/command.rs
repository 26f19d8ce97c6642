use std::borrow::Cow;
use std::fmt::Write;

use crate::error::SqlHelperError;
use crate::types::{CommandType, DatabaseType, RowValues};

/// A command for one helper call: text, how to read it, and ordered parameters.
///
/// Parameters bind positionally, in the order they were added, to the backend's
/// placeholders (`?1` for `SQLite`, `$1` for Postgres, `@P1` for SQL Server). A name only
/// matters for stored procedures, where it becomes a named argument of the call.
///
/// ```rust
/// use sql_helper::prelude::*;
///
/// let by_text = SqlCommand::text("SELECT name FROM users WHERE id = ?1").param(7);
/// let by_proc = SqlCommand::stored_procedure("dbo.get_user").named_param("id", 7);
/// assert_eq!(by_text.values(), by_proc.values());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCommand<'q> {
    text: Cow<'q, str>,
    command_type: CommandType,
    values: Vec<RowValues>,
    names: Vec<Option<String>>,
}

/// One command parameter: a value and, for stored procedures, the argument name.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    pub name: Option<String>,
    pub value: RowValues,
}

impl SqlParameter {
    #[must_use]
    pub fn new(value: impl Into<RowValues>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }
}

/// Whether the caller wants rows back or only a row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallShape {
    Rows,
    NonQuery,
}

impl<'q> SqlCommand<'q> {
    #[must_use]
    pub fn new(text: impl Into<Cow<'q, str>>, command_type: CommandType) -> Self {
        Self {
            text: text.into(),
            command_type,
            values: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Statement text executed as given.
    #[must_use]
    pub fn text(sql: impl Into<Cow<'q, str>>) -> Self {
        Self::new(sql, CommandType::Text)
    }

    /// Name of a stored procedure; the call statement is built per backend.
    #[must_use]
    pub fn stored_procedure(name: impl Into<Cow<'q, str>>) -> Self {
        Self::new(name, CommandType::StoredProcedure)
    }

    /// Append one positional parameter.
    #[must_use]
    pub fn param(mut self, value: impl Into<RowValues>) -> Self {
        self.values.push(value.into());
        self.names.push(None);
        self
    }

    /// Append one parameter that is passed by name to a stored procedure.
    #[must_use]
    pub fn named_param(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.values.push(value.into());
        self.names.push(Some(name.into()));
        self
    }

    /// Append a prepared [`SqlParameter`].
    #[must_use]
    pub fn parameter(mut self, parameter: SqlParameter) -> Self {
        self.values.push(parameter.value);
        self.names.push(parameter.name);
        self
    }

    /// Append positional parameters, keeping their order.
    #[must_use]
    pub fn params(mut self, values: &[RowValues]) -> Self {
        self.values.extend_from_slice(values);
        self.names.resize(self.values.len(), None);
        self
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    /// Parameter values in binding order.
    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    /// Parameters in binding order, with their names.
    pub fn parameters(&self) -> impl Iterator<Item = (Option<&str>, &RowValues)> {
        self.names.iter().map(Option::as_deref).zip(self.values.iter())
    }

    /// Text to send to `db`: the statement itself, or the procedure call built around it.
    pub(crate) fn statement_for(
        &self,
        db: DatabaseType,
        shape: CallShape,
    ) -> Result<Cow<'_, str>, SqlHelperError> {
        match self.command_type {
            CommandType::Text => Ok(Cow::Borrowed(self.text.as_ref())),
            CommandType::StoredProcedure => self.procedure_call(db, shape).map(Cow::Owned),
        }
    }

    fn procedure_call(&self, db: DatabaseType, shape: CallShape) -> Result<String, SqlHelperError> {
        let name = self.text.trim();
        if name.is_empty() {
            return Err(SqlHelperError::ParameterError(
                "stored procedure name is empty".into(),
            ));
        }
        match db {
            #[cfg(feature = "mssql")]
            DatabaseType::Mssql => {
                let mut sql = format!("EXEC {name}");
                for (i, arg_name) in self.names.iter().enumerate() {
                    sql.push_str(if i == 0 { " " } else { ", " });
                    if let Some(arg_name) = arg_name {
                        let _ = write!(sql, "@{} = ", arg_name.trim_start_matches('@'));
                    }
                    let _ = write!(sql, "@P{}", i + 1);
                }
                Ok(sql)
            }
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => {
                let mut args = String::new();
                for (i, arg_name) in self.names.iter().enumerate() {
                    if i > 0 {
                        args.push_str(", ");
                    }
                    if let Some(arg_name) = arg_name {
                        let _ = write!(args, "{} => ", arg_name.trim_start_matches('@'));
                    }
                    let _ = write!(args, "${}", i + 1);
                }
                Ok(match shape {
                    CallShape::Rows => format!("SELECT * FROM {name}({args})"),
                    CallShape::NonQuery => format!("CALL {name}({args})"),
                })
            }
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => {
                let _ = shape;
                Err(SqlHelperError::Unimplemented(format!(
                    "SQLite has no stored procedures (tried to call {name})"
                )))
            }
        }
    }
}
