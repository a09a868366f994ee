//! Query text parser.
//!
//! Clause keywords are recognised only at parenthesis depth zero and outside
//! string literals, so sub-selects and quoted filter values never split a
//! clause.

use super::{FieldRef, QueryParseError, SoqlQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Clause {
    Select,
    From,
    Where,
    OrderBy,
    Limit,
    Offset,
}

impl Clause {
    fn label(self) -> &'static str {
        match self {
            Clause::Select => "SELECT",
            Clause::From => "FROM",
            Clause::Where => "WHERE",
            Clause::OrderBy => "ORDER BY",
            Clause::Limit => "LIMIT",
            Clause::Offset => "OFFSET",
        }
    }
}

/// A clause keyword found in the text: where it starts and where its body starts.
#[derive(Debug)]
struct Marker {
    clause: Clause,
    start: usize,
    body: usize,
}

/// Parse query text into a [`SoqlQuery`].
pub fn parse(text: &str) -> Result<SoqlQuery, QueryParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(QueryParseError::Empty);
    }

    let markers = scan_clauses(text)?;
    match markers.first() {
        Some(m) if m.clause == Clause::Select && m.start == 0 => {}
        _ => return Err(QueryParseError::MissingSelect),
    }

    let mut seen: Vec<Clause> = Vec::with_capacity(markers.len());
    for m in &markers {
        if seen.contains(&m.clause) {
            return Err(QueryParseError::DuplicateClause(m.clause.label()));
        }
        if seen.last().is_some_and(|last| *last > m.clause) {
            return Err(QueryParseError::ClauseOrder(m.clause.label()));
        }
        seen.push(m.clause);
    }
    if !seen.contains(&Clause::From) {
        return Err(QueryParseError::MissingFrom);
    }

    let mut query = SoqlQuery::default();
    for (idx, m) in markers.iter().enumerate() {
        let end = markers.get(idx + 1).map_or(text.len(), |next| next.start);
        let body = text[m.body..end].trim();
        match m.clause {
            Clause::Select => query.fields = split_fields(body)?,
            Clause::From => query.object = parse_object(body)?,
            Clause::Where => query.where_clause = non_empty(body, Clause::Where)?,
            Clause::OrderBy => query.order_by = non_empty(body, Clause::OrderBy)?,
            Clause::Limit => query.limit = Some(parse_number(body, Clause::Limit)?),
            Clause::Offset => query.offset = Some(parse_number(body, Clause::Offset)?),
        }
    }

    Ok(query)
}

fn scan_clauses(text: &str) -> Result<Vec<Marker>, QueryParseError> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let byte_at = |idx: usize| chars.get(idx).map_or(text.len(), |(pos, _)| *pos);

    let mut markers = Vec::new();
    let mut depth: i32 = 0;
    let mut in_quote = false;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];

        if in_quote {
            match c {
                '\\' => i += 2,
                '\'' => {
                    in_quote = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }

        match c {
            '\'' => {
                in_quote = true;
                i += 1;
                continue;
            }
            '(' => {
                depth += 1;
                i += 1;
                continue;
            }
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(QueryParseError::UnbalancedParens);
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        let at_boundary = i == 0 || is_boundary(chars[i - 1].1);
        if depth == 0 && c.is_ascii_alphabetic() && at_boundary {
            let end = word_end(&chars, i);
            let word = text[pos..byte_at(end)].to_ascii_uppercase();
            let found = match word.as_str() {
                "SELECT" => Some((Clause::Select, end)),
                "FROM" => Some((Clause::From, end)),
                "WHERE" => Some((Clause::Where, end)),
                "LIMIT" => Some((Clause::Limit, end)),
                "OFFSET" => Some((Clause::Offset, end)),
                "ORDER" => {
                    let next = skip_whitespace(&chars, end);
                    let next_end = word_end(&chars, next);
                    let is_by = next > end
                        && text[byte_at(next)..byte_at(next_end)].eq_ignore_ascii_case("BY");
                    is_by.then_some((Clause::OrderBy, next_end))
                }
                _ => None,
            };
            if let Some((clause, body_idx)) = found {
                markers.push(Marker {
                    clause,
                    start: pos,
                    body: byte_at(body_idx),
                });
                i = body_idx;
            } else {
                i = end;
            }
            continue;
        }

        i += 1;
    }

    if in_quote {
        return Err(QueryParseError::UnterminatedQuote);
    }
    if depth != 0 {
        return Err(QueryParseError::UnbalancedParens);
    }
    Ok(markers)
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || c == ',' || c == ')'
}

fn word_end(chars: &[(usize, char)], mut i: usize) -> usize {
    while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
        i += 1;
    }
    i
}

fn skip_whitespace(chars: &[(usize, char)], mut i: usize) -> usize {
    while i < chars.len() && chars[i].1.is_whitespace() {
        i += 1;
    }
    i
}

/// Split a select list at top-level commas.
fn split_fields(body: &str) -> Result<Vec<FieldRef>, QueryParseError> {
    if body.is_empty() {
        return Err(QueryParseError::EmptyFieldList);
    }

    let mut fields = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut current = String::new();

    for c in body.chars() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            ',' if !in_quote && depth == 0 => {
                push_field(&mut fields, &current)?;
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    push_field(&mut fields, &current)?;

    Ok(fields)
}

fn push_field(fields: &mut Vec<FieldRef>, text: &str) -> Result<(), QueryParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(QueryParseError::EmptyField(fields.len()));
    }
    fields.push(FieldRef::parse(text));
    Ok(())
}

fn parse_object(body: &str) -> Result<String, QueryParseError> {
    let valid = !body.is_empty() && body.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(QueryParseError::InvalidObject(body.to_string()));
    }
    Ok(body.to_string())
}

fn non_empty(body: &str, clause: Clause) -> Result<Option<String>, QueryParseError> {
    if body.is_empty() {
        return Err(QueryParseError::EmptyClause(clause.label()));
    }
    Ok(Some(body.to_string()))
}

fn parse_number(body: &str, clause: Clause) -> Result<u64, QueryParseError> {
    body.parse().map_err(|_| QueryParseError::InvalidNumber {
        clause: clause.label(),
        value: body.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_query() {
        let query = parse("SELECT Id, Name FROM Account").unwrap();
        assert_eq!(query.object, "Account");
        assert_eq!(query.field_names(), vec!["Id", "Name"]);
        assert!(query.where_clause.is_none());
    }

    #[test]
    fn test_parse_keywords_case_insensitive() {
        let query = parse("select Name from Contact where Email != null limit 5").unwrap();
        assert_eq!(query.object, "Contact");
        assert_eq!(query.where_clause.as_deref(), Some("Email != null"));
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_parse_all_clauses() {
        let query = parse(
            "SELECT Id, Account.Name FROM Contact WHERE LastName = 'From Where' ORDER BY LastName DESC LIMIT 100 OFFSET 10",
        )
        .unwrap();
        assert_eq!(query.where_clause.as_deref(), Some("LastName = 'From Where'"));
        assert_eq!(query.order_by.as_deref(), Some("LastName DESC"));
        assert_eq!(query.limit, Some(100));
        assert_eq!(query.offset, Some(10));
        assert_eq!(
            query.fields[1],
            FieldRef::Relationship("Account.Name".into())
        );
    }

    #[test]
    fn test_parse_subselect_not_split() {
        let query =
            parse("SELECT Id, (SELECT Id FROM Contacts WHERE Name = 'a, b') FROM Account").unwrap();
        assert_eq!(query.object, "Account");
        assert_eq!(query.fields.len(), 2);
        assert!(matches!(query.fields[1], FieldRef::Expression(_)));
    }

    #[test]
    fn test_field_names_containing_keywords() {
        let query = parse("SELECT From__c, Where_Else__c FROM Custom__c").unwrap();
        assert_eq!(query.field_names(), vec!["From__c", "Where_Else__c"]);
        assert_eq!(query.object, "Custom__c");
    }

    #[test]
    fn test_compose_round_trip_is_canonical() {
        let query = parse("  select   Name ,Email   from   Contact  ").unwrap();
        assert_eq!(query.compose(), "SELECT Name, Email FROM Contact");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("   "), Err(QueryParseError::Empty));
        assert_eq!(parse("Name FROM Account"), Err(QueryParseError::MissingSelect));
        assert_eq!(parse("SELECT Name"), Err(QueryParseError::MissingFrom));
        assert_eq!(parse("SELECT FROM Account"), Err(QueryParseError::EmptyFieldList));
        assert_eq!(parse("SELECT Id,,Name FROM Account"), Err(QueryParseError::EmptyField(1)));
        assert_eq!(
            parse("SELECT Id FROM Account Contact"),
            Err(QueryParseError::InvalidObject("Account Contact".into()))
        );
        assert_eq!(
            parse("SELECT Id FROM Account WHERE Name = 'x"),
            Err(QueryParseError::UnterminatedQuote)
        );
        assert_eq!(
            parse("SELECT Id, COUNT(Name FROM Account"),
            Err(QueryParseError::UnbalancedParens)
        );
        assert_eq!(
            parse("SELECT Id FROM Account LIMIT ten"),
            Err(QueryParseError::InvalidNumber {
                clause: "LIMIT",
                value: "ten".into()
            })
        );
        assert_eq!(
            parse("SELECT Id FROM Account LIMIT 5 WHERE Name = 'x'"),
            Err(QueryParseError::ClauseOrder("WHERE"))
        );
        assert_eq!(
            parse("SELECT Id FROM Account WHERE "),
            Err(QueryParseError::EmptyClause("WHERE"))
        );
        assert_eq!(
            parse("SELECT Id FROM Account FROM Contact"),
            Err(QueryParseError::DuplicateClause("FROM"))
        );
    }
}
