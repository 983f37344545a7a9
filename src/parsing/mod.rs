use std::{path::Path, str::FromStr};

use anyhow::anyhow;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::{self, complete::digit1},
    combinator::{eof, map, map_opt, map_res, opt, recognize},
    multi::many0,
    sequence::{pair, preceded, separated_pair, terminated, tuple},
    IResult,
};
use tracing::{debug, info};

use crate::{model::*, time::cycle_at};


#[derive(Debug, PartialEq, Clone)]
pub enum Directive {
    Start(Vec<Payment>),
    HaveNeed { name: String, have_need: Money },
    Payment { from: String, to: String, amount: Money },
    Exit(String),
}

impl Directive {
    pub fn keyword(&self) -> &'static str {
        match self {
            Directive::Start(_) => "start",
            Directive::HaveNeed { .. } => "have-need",
            Directive::Payment { .. } => "payment",
            Directive::Exit(_) => "exit",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
#[allow(dead_code)]
pub struct Entry {
    pub date: NaiveDate,
    pub directive: Directive,
    pub note: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
#[allow(dead_code)]
pub enum Node {
    Comment(String),
    Entry(Entry),
    EmptyLine,
}

fn linespace1(i: &str) -> IResult<&str, &str> {
    take_while1(move |c| " \t".contains(c))(i)
}

fn remaining_text(i: &str) -> IResult<&str, &str> {
    take_while(move |c: char| !character::is_newline(c as u8))(i)
}

fn end_of_line(i: &str) -> IResult<&str, ()> {
    map(pair(opt(linespace1), alt((tag("\n"), eof))), |_| ())(i)
}

fn note(i: &str) -> IResult<&str, &str> {
    preceded(tuple((linespace1, tag(";"), opt(linespace1))), remaining_text)(i)
}

fn rest_of_line(i: &str) -> IResult<&str, Option<&str>> {
    terminated(opt(note), end_of_line)(i)
}

fn name(i: &str) -> IResult<&str, &str> {
    take_while1(move |c: char| c.is_alphanumeric() || "-_.@".contains(c))(i)
}

fn amount(i: &str) -> IResult<&str, Money> {
    map_res(
        recognize(tuple((
            opt(tag("-")),
            opt(tag("$")),
            opt(tag("-")),
            digit1,
            opt(pair(tag("."), digit1)),
        ))),
        |text: &str| BigDecimal::from_str(&text.replace('$', "")),
    )(i)
}

fn unsigned_number(i: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse)(i)
}

fn date_string(i: &str) -> IResult<&str, NaiveDate> {
    map_opt(
        separated_pair(
            separated_pair(unsigned_number, tag("/"), unsigned_number),
            tag("/"),
            unsigned_number,
        ),
        |((year, month), day)| NaiveDate::from_ymd_opt(year as i32, month, day),
    )(i)
}

fn late_payment(i: &str) -> IResult<&str, Payment> {
    map(
        terminated(
            tuple((
                preceded(linespace1, name),
                preceded(linespace1, name),
                preceded(linespace1, amount),
            )),
            rest_of_line,
        ),
        |(from, to, amount)| Payment::new(from, to, amount),
    )(i)
}

type Parsed<'a> = (Directive, Option<&'a str>);

fn start_directive(i: &str) -> IResult<&str, Parsed<'_>> {
    map(
        pair(preceded(tag("start"), rest_of_line), many0(late_payment)),
        |(note, late)| (Directive::Start(late), note),
    )(i)
}

fn have_need_directive(i: &str) -> IResult<&str, Parsed<'_>> {
    map(
        pair(
            preceded(
                pair(tag("have-need"), linespace1),
                separated_pair(name, linespace1, amount),
            ),
            rest_of_line,
        ),
        |((name, have_need), note)| {
            (
                Directive::HaveNeed {
                    name: name.into(),
                    have_need,
                },
                note,
            )
        },
    )(i)
}

fn payment_directive(i: &str) -> IResult<&str, Parsed<'_>> {
    map(
        pair(
            preceded(
                pair(tag("payment"), linespace1),
                tuple((
                    name,
                    preceded(linespace1, name),
                    preceded(linespace1, amount),
                )),
            ),
            rest_of_line,
        ),
        |((from, to, amount), note)| {
            (
                Directive::Payment {
                    from: from.into(),
                    to: to.into(),
                    amount,
                },
                note,
            )
        },
    )(i)
}

fn exit_directive(i: &str) -> IResult<&str, Parsed<'_>> {
    map(
        pair(preceded(pair(tag("exit"), linespace1), name), rest_of_line),
        |(name, note)| (Directive::Exit(name.into()), note),
    )(i)
}

fn parse_entry(i: &str) -> IResult<&str, Node> {
    map(
        separated_pair(
            date_string,
            linespace1,
            alt((
                start_directive,
                have_need_directive,
                payment_directive,
                exit_directive,
            )),
        ),
        |(date, (directive, note))| {
            Node::Entry(Entry {
                date,
                directive,
                note: note.map(|n| n.trim_end().to_owned()),
            })
        },
    )(i)
}

fn parse_comment(i: &str) -> IResult<&str, Node> {
    map(
        preceded(
            alt((tag(";"), tag("#"))),
            terminated(remaining_text, alt((tag("\n"), eof))),
        ),
        |text| Node::Comment(text.into()),
    )(i)
}

fn parse_empty_line(i: &str) -> IResult<&str, Node> {
    map(preceded(opt(linespace1), tag("\n")), |_| Node::EmptyLine)(i)
}

fn parse_node(i: &str) -> IResult<&str, Node> {
    alt((parse_empty_line, parse_entry, parse_comment))(i)
}

pub fn parse_str(i: &str) -> Result<Vec<Node>> {
    let (remaining, nodes) = many0(parse_node)(i).map_err(|e| anyhow!("{:?}", e))?;

    if !remaining.is_empty() {
        let line = i[..i.len() - remaining.len()].matches('\n').count() + 1;
        let text = remaining.lines().next().unwrap_or_default();
        return Err(anyhow!("Unparseable event on line {}: '{}'", line, text));
    }

    Ok(nodes)
}

#[derive(Debug)]
pub struct EventLog {
    nodes: Vec<Node>,
}

impl EventLog {
    pub fn parse(path: &Path) -> Result<Self> {
        info!("parsing {:?}", path);

        let data = std::fs::read_to_string(path)?;
        let nodes = parse_str(&data).map_err(|e| anyhow!("{}: {}", path.display(), e))?;

        Ok(Self { nodes })
    }

    pub fn parse_text(text: &str) -> Result<Self> {
        Ok(Self {
            nodes: parse_str(text)?,
        })
    }

    pub fn iter_entries(&self) -> impl Iterator<Item = &Entry> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Entry(entry) => Some(entry),
            _ => None,
        })
    }

    /// Converts entries into engine events. Cycle positions are measured from
    /// the date of the leading `start`, which becomes cycle zero.
    pub fn events(&self) -> Result<Vec<Event>> {
        let mut entries = self.iter_entries();

        let first = entries
            .next()
            .ok_or_else(|| anyhow!("Event log has no entries"))?;
        let created = first.date;
        let seed = match &first.directive {
            Directive::Start(late) => CycleStart::new(Cycle::zero(), created)
                .with_late_payments(late.iter().cloned().collect()),
            other => {
                return Err(anyhow!(
                    "Event log must begin with 'start', found '{}' on {}",
                    other.keyword(),
                    created
                ))
            }
        };

        let mut previous = created;
        let mut events = vec![Event::CycleStart(seed)];

        for entry in entries {
            if entry.date < previous {
                return Err(anyhow!(
                    "Out of order: '{}' on {} follows {}",
                    entry.directive.keyword(),
                    entry.date,
                    previous
                ));
            }
            previous = entry.date;

            let cycle = cycle_at(created, entry.date)?;
            let event = match &entry.directive {
                Directive::Start(late) if !late.is_empty() => {
                    return Err(anyhow!(
                        "Late payments may only seed the first 'start', found some on {}",
                        entry.date
                    ))
                }
                Directive::Start(_) => Event::CycleStart(CycleStart::new(cycle, entry.date)),
                Directive::HaveNeed { name, have_need } => Event::HaveNeed {
                    name: name.clone(),
                    have_need: have_need.clone(),
                    cycle,
                },
                Directive::Payment { from, to, amount } => Event::Payment {
                    from: from.clone(),
                    to: to.clone(),
                    amount: amount.clone(),
                    cycle,
                },
                Directive::Exit(name) => Event::UserExitsGroup {
                    name: name.clone(),
                    cycle,
                },
            };

            events.push(event);
        }

        debug!(events = events.len(), "converted");

        Ok(events)
    }
}
