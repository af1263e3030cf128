//! The smart-playlist predicate grammar: comparisons, `and`/`or`, and
//! parenthesized grouping, compiled into a parameterized SQL `WHERE`
//! fragment over a fixed column whitelist.
//!
//! Grammar shape grounded in the `peg`-based command grammars under
//! `mpd_protocol/command_parser/`; the filter vocabulary (equals,
//! not-equals, contains, starts-with) is grounded in
//! `mpd_protocol/query.rs`'s `Filter` enum, narrowed to the columns this
//! catalog actually indexes (spec §4.4).

use rusqlite::types::Value as SqlValue;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Artist,
    Album,
    AlbumArtist,
    Genre,
    Composer,
    Title,
    MediaKind,
    DataKind,
    Rating,
    PlayCount,
    SkipCount,
    Disabled,
    Year,
    Track,
    Disc,
    TimeAdded,
    TimeModified,
}

impl Column {
    /// The real `files` column this predicate column maps to. All
    /// comparisons compile against this whitelist — client text never
    /// reaches the SQL prepare step any other way.
    fn sql_name(self) -> &'static str {
        match self {
            Column::Artist => "f.artist",
            Column::Album => "f.album",
            Column::AlbumArtist => "f.album_artist",
            Column::Genre => "f.genre",
            Column::Composer => "f.composer",
            Column::Title => "f.title",
            Column::MediaKind => "f.media_kind",
            Column::DataKind => "f.data_kind",
            Column::Rating => "f.rating",
            Column::PlayCount => "f.play_count",
            Column::SkipCount => "f.skip_count",
            Column::Disabled => "f.disabled",
            Column::Year => "f.year",
            Column::Track => "f.track",
            Column::Disc => "f.disc",
            Column::TimeAdded => "f.time_added",
            Column::TimeModified => "f.time_modified",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            Column::MediaKind
                | Column::DataKind
                | Column::Rating
                | Column::PlayCount
                | Column::SkipCount
                | Column::Disabled
                | Column::Year
                | Column::Track
                | Column::Disc
                | Column::TimeAdded
                | Column::TimeModified
        )
    }

    fn from_name(name: &str) -> Option<Column> {
        Some(match name {
            "artist" => Column::Artist,
            "album" => Column::Album,
            "album_artist" => Column::AlbumArtist,
            "genre" => Column::Genre,
            "composer" => Column::Composer,
            "title" => Column::Title,
            "media_kind" => Column::MediaKind,
            "data_kind" => Column::DataKind,
            "rating" => Column::Rating,
            "play_count" => Column::PlayCount,
            "skip_count" => Column::SkipCount,
            "disabled" => Column::Disabled,
            "year" => Column::Year,
            "track" => Column::Track,
            "disc" => Column::Disc,
            "time_added" => Column::TimeAdded,
            "time_modified" => Column::TimeModified,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    NotEq,
    Contains,
    StartsWith,
    Gt,
    Lt,
    Gte,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq)]
enum Ast {
    Compare(Column, CompareOp, Literal),
    And(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
    Not(Box<Ast>),
}

peg::parser! {
    grammar predicate() for str {
        pub rule expression() -> Ast = _ e:or_expr() _ { e }

        rule or_expr() -> Ast
            = head:and_expr() tail:(_ "or" _ e:and_expr() { e })*
              { tail.into_iter().fold(head, |a, b| Ast::Or(Box::new(a), Box::new(b))) }

        rule and_expr() -> Ast
            = head:term() tail:(_ "and" _ e:term() { e })*
              { tail.into_iter().fold(head, |a, b| Ast::And(Box::new(a), Box::new(b))) }

        rule term() -> Ast
            = "(" _ e:or_expr() _ ")" { e }
            / "not" _ e:term() { Ast::Not(Box::new(e)) }
            / comparison()

        rule comparison() -> Ast
            = col:ident() _ op:operator() _ lit:literal()
              { Ast::Compare(col, op, lit) }

        rule operator() -> CompareOp
            = "==" { CompareOp::Eq }
            / "!=" { CompareOp::NotEq }
            / ">=" { CompareOp::Gte }
            / "<=" { CompareOp::Lte }
            / ">" { CompareOp::Gt }
            / "<" { CompareOp::Lt }
            / "contains" { CompareOp::Contains }
            / "starts_with" { CompareOp::StartsWith }

        rule ident() -> Column
            = s:$(['a'..='z' | '_']+) {?
                Column::from_name(s).ok_or("unknown column")
              }

        rule literal() -> Literal
            = n:number() { Literal::Int(n) }
            / s:string() { Literal::Str(s) }

        rule number() -> i64
            = n:$("-"? ['0'..='9']+) { n.parse().unwrap() }

        rule string() -> String
            = "\"" s:$([^ '"']*) "\"" { s.to_string() }
            / "'" s:$([^ '\'']*) "'" { s.to_string() }

        rule _() = quiet!{[' ' | '\t']*}
    }
}

/// A predicate string compiled into a parameterized SQL fragment. `sql`
/// references no client text directly — every value is a `?` bound from
/// `params`.
pub struct CompiledPredicate {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Parses and compiles a smart-playlist predicate string. Any grammar or
/// whitelist rejection is a [`CoreError::ClientMalformed`] carrying a
/// message suitable for the response's `errorstring`.
pub fn compile(input: &str) -> Result<CompiledPredicate, CoreError> {
    let ast = predicate::expression(input)
        .map_err(|e| CoreError::ClientMalformed(format!("invalid predicate at {}: expected {}", e.location, e.expected)))?;
    let mut params = Vec::new();
    let sql = render(&ast, &mut params)?;
    Ok(CompiledPredicate { sql, params })
}

fn render(ast: &Ast, params: &mut Vec<SqlValue>) -> Result<String, CoreError> {
    match ast {
        Ast::And(a, b) => Ok(format!("({} AND {})", render(a, params)?, render(b, params)?)),
        Ast::Or(a, b) => Ok(format!("({} OR {})", render(a, params)?, render(b, params)?)),
        Ast::Not(a) => Ok(format!("(NOT {})", render(a, params)?)),
        Ast::Compare(col, op, lit) => render_comparison(*col, *op, lit, params),
    }
}

fn render_comparison(
    col: Column,
    op: CompareOp,
    lit: &Literal,
    params: &mut Vec<SqlValue>,
) -> Result<String, CoreError> {
    let name = col.sql_name();

    if col.is_numeric() {
        let Literal::Int(n) = lit else {
            return Err(CoreError::ClientMalformed(format!(
                "column {name} requires a numeric value"
            )));
        };
        let sql_op = match op {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
            CompareOp::Contains | CompareOp::StartsWith => {
                return Err(CoreError::ClientMalformed(format!(
                    "column {name} does not support text operators"
                )));
            }
        };
        params.push(SqlValue::Integer(*n));
        return Ok(format!("{name} {sql_op} ?"));
    }

    let Literal::Str(s) = lit else {
        return Err(CoreError::ClientMalformed(format!(
            "column {name} requires a text value"
        )));
    };
    match op {
        CompareOp::Eq => {
            params.push(SqlValue::Text(s.clone()));
            Ok(format!("{name} = ?"))
        }
        CompareOp::NotEq => {
            params.push(SqlValue::Text(s.clone()));
            Ok(format!("{name} <> ?"))
        }
        CompareOp::Contains => {
            params.push(SqlValue::Text(format!("%{s}%")));
            Ok(format!("like(?, {name}) = 1"))
        }
        CompareOp::StartsWith => {
            params.push(SqlValue::Text(format!("{s}%")));
            Ok(format!("like(?, {name}) = 1"))
        }
        CompareOp::Gt | CompareOp::Lt | CompareOp::Gte | CompareOp::Lte => Err(
            CoreError::ClientMalformed(format!("column {name} does not support ordering operators")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn compiles_simple_equality() {
        let p = compile("artist == \"Radiohead\"").unwrap();
        assert_eq!(p.sql, "f.artist = ?");
        assert_eq!(p.params, vec![SqlValue::Text("Radiohead".to_string())]);
    }

    #[test]
    fn compiles_and_or_with_grouping() {
        let p = compile("(media_kind == 1 and rating >= 80) or genre contains \"jazz\"").unwrap();
        assert!(p.sql.contains("AND"));
        assert!(p.sql.contains("OR"));
        assert_eq!(p.params.len(), 3);
    }

    #[test]
    fn compiles_builtin_playlist_predicates() {
        let p = compile("media_kind == 4").unwrap();
        assert_eq!(p.sql, "f.media_kind = ?");
        assert_eq!(p.params, vec![SqlValue::Integer(4)]);
    }

    #[test]
    fn rejects_unknown_column() {
        assert!(compile("nonexistent == 1").is_err());
    }

    #[test]
    fn rejects_text_operator_on_numeric_column() {
        assert!(compile("rating contains \"x\"").is_err());
    }

    #[test]
    fn rejects_ordering_operator_on_text_column() {
        assert!(compile("artist > \"a\"").is_err());
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(compile("this is not a predicate at all ===").is_err());
    }
}
