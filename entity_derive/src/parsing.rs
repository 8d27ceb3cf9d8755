//! Parsing utilities for entity and column attributes
//!
//! This module handles the parsing of `#[entity]`, `#[key]` and `#[column]`
//! attributes and validation of table and column names.

use syn::{Data, DeriveInput, Error, Fields, Ident, LitStr, Result, Type};

/// Struct-level information parsed from `#[entity(...)]`
pub struct TableInfo {
    pub table: String,
}

/// Per-field information parsed from `#[key]` / `#[column(...)]`
pub struct FieldInfo {
    pub ident: Ident,
    pub ty: Type,
    pub column: String,
    pub is_key: bool,
    pub skip: bool,
}

/// Validation logic that mirrors the runtime identifier rules
fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".to_string());
    }

    // PostgreSQL identifier limit
    if name.len() > 63 {
        return Err(format!(
            "Name '{}' is too long: {} characters (max 63)",
            name,
            name.len()
        ));
    }

    let first_char = name
        .chars()
        .next()
        .ok_or_else(|| "Name cannot be empty".to_string())?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(format!(
            "Name '{}' must start with a letter or underscore",
            name
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!(
            "Name '{}' contains invalid characters: only alphanumeric characters and underscores are allowed",
            name
        ));
    }

    if is_reserved_keyword(name) {
        return Err(format!("Name '{}' is a reserved SQL keyword", name));
    }

    Ok(())
}

fn is_reserved_keyword(name: &str) -> bool {
    const RESERVED_KEYWORDS: &[&str] = &[
        "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "ON", "AS", "AND", "OR",
        "NOT", "NULL", "TRUE", "FALSE", "ORDER", "BY", "GROUP", "HAVING", "LIMIT", "OFFSET",
        "UNION", "ALL", "DISTINCT", "COUNT", "MIN", "MAX", "CREATE", "DROP", "ALTER", "TABLE",
        "INDEX", "PRIMARY", "KEY", "FOREIGN", "REFERENCES", "UNIQUE", "CHECK", "DEFAULT",
        "CONSTRAINT", "COLUMN", "RETURNING", "USER", "CURRENT_DATE", "CURRENT_TIME",
        "CURRENT_TIMESTAMP",
    ];

    let upper = name.to_uppercase();
    RESERVED_KEYWORDS.contains(&upper.as_str())
}

/// Parse the struct-level `#[entity(table = "...")]` attribute
pub fn parse_entity_attributes(input: &DeriveInput) -> Result<TableInfo> {
    let mut table = None;

    for attr in &input.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let lit: LitStr = meta.value()?.parse()?;
                    validate_identifier(&lit.value())
                        .map_err(|e| Error::new(lit.span(), format!("Invalid table name: {}", e)))?;
                    table = Some(lit.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported entity attribute; expected `table`"))
                }
            })?;
        }
    }

    match table {
        Some(table) => Ok(TableInfo { table }),
        None => Err(Error::new_spanned(
            &input.ident,
            "Entity derive requires #[entity(table = \"...\")]",
        )),
    }
}

/// Parse per-field `#[key]` and `#[column(...)]` attributes
pub fn parse_fields(data: &Data, table_info: &TableInfo) -> Result<Vec<FieldInfo>> {
    let fields = match data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    proc_macro2::Span::call_site(),
                    "Entity derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                proc_macro2::Span::call_site(),
                "Entity derive only supports structs",
            ))
        }
    };

    let mut parsed = Vec::with_capacity(fields.len());

    for field in fields {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;

        let mut column = ident.to_string();
        let mut is_key = false;
        let mut skip = false;

        for attr in &field.attrs {
            if attr.path().is_ident("key") {
                is_key = true;
            } else if attr.path().is_ident("column") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("name") {
                        let lit: LitStr = meta.value()?.parse()?;
                        column = lit.value();
                        Ok(())
                    } else if meta.path.is_ident("skip") {
                        skip = true;
                        Ok(())
                    } else {
                        Err(meta.error("unsupported column attribute; expected `name` or `skip`"))
                    }
                })?;
            }
        }

        if !skip {
            validate_identifier(&column).map_err(|e| {
                Error::new_spanned(field, format!("Invalid column name: {}", e))
            })?;
        }

        if is_key && skip {
            return Err(Error::new_spanned(
                field,
                "the #[key] field cannot be skipped",
            ));
        }

        parsed.push(FieldInfo {
            ident,
            ty: field.ty.clone(),
            column,
            is_key,
            skip,
        });
    }

    let mapped: Vec<_> = parsed.iter().filter(|f| !f.skip).collect();
    if mapped.is_empty() {
        return Err(Error::new(
            proc_macro2::Span::call_site(),
            format!(
                "entity '{}' has no mappable fields; remove #[column(skip)] from at least one field",
                table_info.table
            ),
        ));
    }

    let key_count = mapped.iter().filter(|f| f.is_key).count();
    if key_count != 1 {
        return Err(Error::new(
            proc_macro2::Span::call_site(),
            format!(
                "entity '{}' must mark exactly one field with #[key], found {}",
                table_info.table, key_count
            ),
        ));
    }

    Ok(parsed)
}
