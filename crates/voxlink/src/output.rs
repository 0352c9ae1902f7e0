use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use voxlink_client::ConnectionEvent;
use voxlink_wire::{FavoriteLine, InboundMessage, TriggerTarget};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// Protocol lines only; connection events go to the log.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record<'a> {
    Message {
        message: &'a InboundMessage,
        timestamp: String,
    },
    Connection {
        event: ConnectionEvent,
        endpoint: &'a str,
        timestamp: String,
    },
    Line {
        line: &'a str,
        favorite: Option<&'static str>,
        timestamp: String,
    },
}

fn print_json(record: &Record<'_>) {
    println!(
        "{}",
        serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, row: Vec<String>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header)
        .add_row(row);
    println!("{table}");
}

pub fn print_message(message: &InboundMessage, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&Record::Message {
            message,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let (kind, detail, score) = describe_message(message);
            print_table(
                vec!["TYPE", "DETAIL", "SCORE"],
                vec![kind.to_string(), detail, score.map(format_score).unwrap_or_default()],
            );
        }
        OutputFormat::Pretty => {
            let (kind, detail, score) = describe_message(message);
            match score {
                Some(score) => println!("{kind} {detail} score={}", format_score(score)),
                None => println!("{kind} {detail}"),
            }
        }
        OutputFormat::Raw => println!("{}", wire_form(message)),
    }
}

pub fn print_event(event: ConnectionEvent, endpoint: &str, format: OutputFormat) {
    let name = match event {
        ConnectionEvent::Connected => "connected",
        ConnectionEvent::Disconnected => "disconnected",
    };
    match format {
        OutputFormat::Json => print_json(&Record::Connection {
            event,
            endpoint,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => print_table(
            vec!["EVENT", "ENDPOINT"],
            vec![name.to_string(), endpoint.to_string()],
        ),
        OutputFormat::Pretty => println!("{name} endpoint={endpoint}"),
        OutputFormat::Raw => {}
    }
}

/// A command line as the mock companion received it.
pub fn print_line(line: &str, favorite: Option<&FavoriteLine>, format: OutputFormat) {
    let favorite = favorite.map(favorite_label);
    match format {
        OutputFormat::Json => print_json(&Record::Line {
            line,
            favorite,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => print_table(
            vec!["LINE", "FAVORITE"],
            vec![line.to_string(), favorite.unwrap_or("").to_string()],
        ),
        OutputFormat::Pretty => match favorite {
            Some(kind) => println!("{line}  [favorite {kind}]"),
            None => println!("{line}"),
        },
        OutputFormat::Raw => println!("{line}"),
    }
}

fn favorite_label(line: &FavoriteLine) -> &'static str {
    match line {
        FavoriteLine::Begin => "begin",
        FavoriteLine::Shout(_) => "shout",
        FavoriteLine::Power(_) => "power",
        FavoriteLine::Weapon(_) => "weapon",
        FavoriteLine::Spell(_) => "spell",
        FavoriteLine::Potion(_) => "potion",
        FavoriteLine::End => "end",
    }
}

/// Type, human detail, and score of a message.
fn describe_message(message: &InboundMessage) -> (&'static str, String, Option<f32>) {
    match message {
        InboundMessage::Result { index, score } => {
            let detail = if message.is_close_request() {
                "close request".to_string()
            } else {
                match message.selection() {
                    Some(option) => format!("option={option}"),
                    None => format!("no match (index={index})"),
                }
            };
            ("RES", detail, Some(*score))
        }
        InboundMessage::Trigger(trigger) => {
            let target = match &trigger.target {
                TriggerTarget::Shout {
                    plugin,
                    form_id,
                    power,
                } => format!(" plugin={plugin} form={form_id} power={power}"),
                TriggerTarget::Form { form_id } => format!(" form={form_id}"),
                TriggerTarget::None => String::new(),
            };
            (
                "TRIG",
                format!("{}{target} text={:?}", trigger.kind, trigger.text),
                Some(trigger.score),
            )
        }
        InboundMessage::Debug { text } => ("DBG", text.clone(), None),
    }
}

/// The message rendered back into the companion's line format.
pub fn wire_form(message: &InboundMessage) -> String {
    match message {
        InboundMessage::Result { index, score } => format!("RES|{index}|{}", format_score(*score)),
        InboundMessage::Trigger(trigger) => {
            let score = format_score(trigger.score);
            match &trigger.target {
                TriggerTarget::Shout {
                    plugin,
                    form_id,
                    power,
                } => format!(
                    "TRIG|{}|{plugin}|{form_id}|{power}|{score}|{}",
                    trigger.kind, trigger.text
                ),
                TriggerTarget::Form { form_id } => {
                    format!("TRIG|{}|{form_id}|{score}|{}", trigger.kind, trigger.text)
                }
                TriggerTarget::None => format!("TRIG|{}|{score}|{}", trigger.kind, trigger.text),
            }
        }
        InboundMessage::Debug { text } => format!("DBG|{text}"),
    }
}

fn format_score(score: f32) -> String {
    format!("{score:.3}")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use voxlink_wire::{decode_line, parse_favorite_line, InboundLine};

    use super::*;

    fn message(line: &str) -> InboundMessage {
        match decode_line(line) {
            InboundLine::Message(message) => message,
            other => panic!("not a message: {other:?}"),
        }
    }

    #[test]
    fn raw_form_matches_companion_lines() {
        for line in [
            "RES|2|0.875",
            "TRIG|shout|Skyrim.esm|0x00013E07|3|0.812|fus ro dah",
            "TRIG|spell|0x00012FCD|0.700|flames",
            "TRIG|open|0.930|hello there",
            "DBG|grammar|reloaded",
        ] {
            assert_eq!(wire_form(&message(line)), line);
        }
    }

    #[test]
    fn result_detail_names_the_outcome() {
        assert_eq!(describe_message(&message("RES|1|0.5")).1, "option=1");
        assert_eq!(describe_message(&message("RES|-2|1.0")).1, "close request");
        assert_eq!(
            describe_message(&message("RES|bad|x")).1,
            "no match (index=-1)"
        );
    }

    #[test]
    fn trigger_detail_includes_target() {
        let (kind, detail, score) =
            describe_message(&message("TRIG|power|0x000E40C8|0.600|dragon skin"));
        assert_eq!(kind, "TRIG");
        assert_eq!(detail, "power form=0x000E40C8 text=\"dragon skin\"");
        assert_eq!(score, Some(0.6));
    }

    #[test]
    fn message_json_is_tagged() {
        let record = Record::Message {
            message: &message("RES|0|0.25"),
            timestamp: "0".to_string(),
        };
        let value: serde_json::Value =
            serde_json::to_value(&record).expect("record should serialize");
        assert_eq!(value["record"], "message");
        assert_eq!(value["message"]["type"], "result");
        assert_eq!(value["message"]["index"], 0);
    }

    #[test]
    fn favorite_labels() {
        let shout = parse_favorite_line("FAV|SHOUT|Skyrim.esm|0x1|Fus|Fus").unwrap();
        assert_eq!(favorite_label(&shout), "shout");
        assert_eq!(favorite_label(&FavoriteLine::End), "end");
    }
}
