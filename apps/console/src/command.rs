use admindeck_core::{AppError, AppResult};

pub const USAGE: &str = "usage: admindeck-console list [search term] | delete <record id>";

/// Action requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List { search: Option<String> },
    Delete { record_id: String },
}

impl Command {
    /// Parses arguments after the program name. No arguments lists the first page.
    pub fn parse(args: &[String]) -> AppResult<Self> {
        match args.split_first() {
            None => Ok(Self::List { search: None }),
            Some((verb, rest)) => match verb.as_str() {
                "list" => {
                    let term = rest.join(" ");
                    let term = term.trim();
                    Ok(Self::List {
                        search: (!term.is_empty()).then(|| term.to_owned()),
                    })
                }
                "delete" => match rest {
                    [record_id] if !record_id.trim().is_empty() => Ok(Self::Delete {
                        record_id: record_id.trim().to_owned(),
                    }),
                    _ => Err(AppError::Validation(format!(
                        "delete takes exactly one record id; {USAGE}"
                    ))),
                },
                other => Err(AppError::Validation(format!(
                    "unknown command '{other}'; {USAGE}"
                ))),
            },
        }
    }
}
