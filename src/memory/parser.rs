/// Parser for the sequence DDL understood by `MemoryConnection`
///
/// Supported:
/// - CREATE SEQUENCE name [INCREMENT [BY] n] [MINVALUE n] [MAXVALUE n] [START [WITH] n] [CACHE n] [[NO] CYCLE]
/// - ALTER SEQUENCE name RENAME TO new | OWNER TO role | SET SCHEMA schema
/// - ALTER SEQUENCE name option... (options above plus RESTART [[WITH] n])
/// - COMMENT ON SEQUENCE name IS 'text' | E'text' | NULL
/// - DROP SEQUENCE name [CASCADE]
///
/// Names are `"quoted"` (with `""` escapes) or bare (folded to lower case),
/// optionally schema-qualified.
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{alpha1, char, digit1, multispace0, none_of},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

use crate::core::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqOption {
    Increment(i64),
    MinValue(i64),
    MaxValue(i64),
    Start(i64),
    /// `None` restarts at the start value
    Restart(Option<i64>),
    Cache(i64),
    Cycle(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterAction {
    Rename(String),
    OwnerTo(String),
    SetSchema(String),
    Options(Vec<SeqOption>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateSequence {
        target: QualifiedName,
        options: Vec<SeqOption>,
    },
    AlterSequence {
        target: QualifiedName,
        action: AlterAction,
    },
    CommentOnSequence {
        target: QualifiedName,
        comment: Option<String>,
    },
    DropSequence {
        target: QualifiedName,
        cascade: bool,
    },
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn bare_identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
        )),
        str::to_lowercase,
    )(input)
}

fn quoted_identifier(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('"'),
            many0(alt((value('"', tag("\"\"")), none_of("\"")))),
            char('"'),
        ),
        |chars: Vec<char>| chars.into_iter().collect(),
    )(input)
}

pub fn identifier(input: &str) -> IResult<&str, String> {
    alt((quoted_identifier, bare_identifier))(input)
}

pub fn qualified_name(input: &str) -> IResult<&str, QualifiedName> {
    let (input, first) = identifier(input)?;
    let (input, second) = opt(preceded(char('.'), identifier))(input)?;
    let name = match second {
        Some(name) => QualifiedName {
            schema: Some(first),
            name,
        },
        None => QualifiedName {
            schema: None,
            name: first,
        },
    };
    Ok((input, name))
}

/// `'text'` with `''` escapes; backslashes are literal
fn standard_string(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('\''),
            many0(alt((value('\'', tag("''")), none_of("'")))),
            char('\''),
        ),
        |chars: Vec<char>| chars.into_iter().collect(),
    )(input)
}

/// `E'text'` where `\\` and `\'` are escapes as well as `''`
fn escape_string(input: &str) -> IResult<&str, String> {
    map(
        preceded(
            tag_no_case("E"),
            delimited(
                char('\''),
                many0(alt((
                    value('\'', tag("''")),
                    value('\'', tag("\\'")),
                    value('\\', tag("\\\\")),
                    none_of("'\\"),
                ))),
                char('\''),
            ),
        ),
        |chars: Vec<char>| chars.into_iter().collect(),
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((escape_string, standard_string))(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<i64>)(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    ws(tag_no_case(word))
}

fn seq_option(input: &str) -> IResult<&str, SeqOption> {
    alt((
        map(
            preceded(pair(keyword("INCREMENT"), opt(keyword("BY"))), ws(integer)),
            SeqOption::Increment,
        ),
        map(preceded(keyword("MINVALUE"), ws(integer)), SeqOption::MinValue),
        map(preceded(keyword("MAXVALUE"), ws(integer)), SeqOption::MaxValue),
        map(
            preceded(keyword("RESTART"), opt(preceded(opt(keyword("WITH")), ws(integer)))),
            SeqOption::Restart,
        ),
        map(
            preceded(pair(keyword("START"), opt(keyword("WITH"))), ws(integer)),
            SeqOption::Start,
        ),
        map(preceded(keyword("CACHE"), ws(integer)), SeqOption::Cache),
        value(SeqOption::Cycle(false), pair(keyword("NO"), keyword("CYCLE"))),
        value(SeqOption::Cycle(true), keyword("CYCLE")),
    ))(input)
}

fn create_sequence(input: &str) -> IResult<&str, Command> {
    let (input, _) = keyword("CREATE")(input)?;
    let (input, _) = keyword("SEQUENCE")(input)?;
    let (input, target) = ws(qualified_name)(input)?;
    let (input, options) = many0(seq_option)(input)?;
    Ok((input, Command::CreateSequence { target, options }))
}

fn alter_action(input: &str) -> IResult<&str, AlterAction> {
    alt((
        map(
            preceded(pair(keyword("RENAME"), keyword("TO")), ws(identifier)),
            AlterAction::Rename,
        ),
        map(
            preceded(pair(keyword("OWNER"), keyword("TO")), ws(identifier)),
            AlterAction::OwnerTo,
        ),
        map(
            preceded(pair(keyword("SET"), keyword("SCHEMA")), ws(identifier)),
            AlterAction::SetSchema,
        ),
        map(many1(seq_option), AlterAction::Options),
    ))(input)
}

fn alter_sequence(input: &str) -> IResult<&str, Command> {
    let (input, _) = keyword("ALTER")(input)?;
    let (input, _) = keyword("SEQUENCE")(input)?;
    let (input, target) = ws(qualified_name)(input)?;
    let (input, action) = alter_action(input)?;
    Ok((input, Command::AlterSequence { target, action }))
}

fn comment_on_sequence(input: &str) -> IResult<&str, Command> {
    let (input, _) = keyword("COMMENT")(input)?;
    let (input, _) = keyword("ON")(input)?;
    let (input, _) = keyword("SEQUENCE")(input)?;
    let (input, target) = ws(qualified_name)(input)?;
    let (input, _) = keyword("IS")(input)?;
    let (input, comment) = alt((
        map(ws(string_literal), Some),
        value(None, keyword("NULL")),
    ))(input)?;
    Ok((input, Command::CommentOnSequence { target, comment }))
}

fn drop_sequence(input: &str) -> IResult<&str, Command> {
    let (input, _) = keyword("DROP")(input)?;
    let (input, _) = keyword("SEQUENCE")(input)?;
    let (input, target) = ws(qualified_name)(input)?;
    let (input, cascade) = opt(keyword("CASCADE"))(input)?;
    Ok((
        input,
        Command::DropSequence {
            target,
            cascade: cascade.is_some(),
        },
    ))
}

/// Parse one statement; a trailing semicolon is allowed
pub fn parse_command(sql: &str) -> Result<Command, EngineError> {
    all_consuming(terminated(
        alt((create_sequence, alter_sequence, comment_on_sequence, drop_sequence)),
        opt(ws(char(';'))),
    ))(sql)
    .map(|(_, cmd)| cmd)
    .map_err(|e| EngineError::syntax_error(format!("cannot parse statement: {e}")))
}

/// Parse the text form of a `regclass` argument (`"schema"."name"`)
pub fn parse_regclass(text: &str) -> Result<QualifiedName, EngineError> {
    all_consuming(ws(qualified_name))(text)
        .map(|(_, name)| name)
        .map_err(|_| EngineError::syntax_error(format!("invalid relation name: {text}")))
}
