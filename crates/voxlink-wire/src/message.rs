//! Inbound line classification.
//!
//! Decoding never fails: malformed `RES` lines degrade to "no match" and
//! malformed `TRIG` lines keep whatever fields parsed, with a zero score.

use std::fmt;

use serde::{Serialize, Serializer};

/// `RES` index meaning "nothing matched".
pub const NO_MATCH_INDEX: i32 = -1;
/// `RES` index the companion uses to ask for the dialogue to be closed.
pub const CLOSE_REQUEST_INDEX: i32 = -2;
/// Prefix of the companion's listen-status lines.
pub const STATUS_PREFIX: &str = "effective:";

/// A message the companion sent for the game-facing side to act on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Dialogue option recognition result (`RES|<index>|<score>`).
    Result { index: i32, score: f32 },
    /// The recognizer fired an action (`TRIG|<kind>|...`).
    Trigger(Trigger),
    /// Debug text to surface to the player (`DBG|<text>`).
    Debug { text: String },
}

impl InboundMessage {
    /// Zero-based dialogue option index, for results that selected one.
    pub fn selection(&self) -> Option<usize> {
        match self {
            InboundMessage::Result { index, .. } => usize::try_from(*index).ok(),
            _ => None,
        }
    }

    /// Whether this is a result asking for the dialogue to close.
    pub fn is_close_request(&self) -> bool {
        matches!(self, InboundMessage::Result { index, .. } if *index == CLOSE_REQUEST_INDEX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Open,
    Shout,
    Power,
    Weapon,
    Spell,
    Potion,
    Other(String),
}

impl TriggerKind {
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "open" => TriggerKind::Open,
            "shout" => TriggerKind::Shout,
            "power" => TriggerKind::Power,
            "weapon" => TriggerKind::Weapon,
            "spell" => TriggerKind::Spell,
            "potion" => TriggerKind::Potion,
            other => TriggerKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TriggerKind::Open => "open",
            TriggerKind::Shout => "shout",
            TriggerKind::Power => "power",
            TriggerKind::Weapon => "weapon",
            TriggerKind::Spell => "spell",
            TriggerKind::Potion => "potion",
            TriggerKind::Other(kind) => kind,
        }
    }

    /// Kinds whose payload starts with a form ID.
    fn carries_form_id(&self) -> bool {
        matches!(
            self,
            TriggerKind::Power | TriggerKind::Weapon | TriggerKind::Spell | TriggerKind::Potion
        )
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TriggerKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// What a trigger acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum TriggerTarget {
    None,
    /// `power` is 1..=3 when parsed, 0 when the field was missing or invalid.
    Shout {
        plugin: String,
        form_id: String,
        power: u8,
    },
    Form {
        form_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub score: f32,
    /// Recognized text. May contain `|`.
    pub text: String,
    pub target: TriggerTarget,
}

impl Trigger {
    fn empty(kind: TriggerKind) -> Self {
        let target = if kind == TriggerKind::Shout {
            TriggerTarget::Shout {
                plugin: String::new(),
                form_id: String::new(),
                power: 0,
            }
        } else if kind.carries_form_id() {
            TriggerTarget::Form {
                form_id: String::new(),
            }
        } else {
            TriggerTarget::None
        };
        Self {
            kind,
            score: 0.0,
            text: String::new(),
            target,
        }
    }

    /// Form ID for shout, power, weapon, spell, and potion triggers.
    pub fn form_id(&self) -> Option<&str> {
        match &self.target {
            TriggerTarget::Shout { form_id, .. } | TriggerTarget::Form { form_id } => {
                Some(form_id)
            }
            TriggerTarget::None => None,
        }
    }
}

/// Classification of one inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundLine {
    Message(InboundMessage),
    /// Listen-status report; payload after [`STATUS_PREFIX`].
    Status(String),
    /// Anything else; logged as raw receipt.
    Unrecognized(String),
}

/// Classify a line received from the companion (terminator already removed).
pub fn decode_line(line: &str) -> InboundLine {
    if let Some(rest) = line.strip_prefix("RES|") {
        return InboundLine::Message(decode_result(rest));
    }
    if let Some(rest) = line.strip_prefix("TRIG|") {
        return InboundLine::Message(InboundMessage::Trigger(decode_trigger(rest)));
    }
    if let Some(text) = line.strip_prefix("DBG|") {
        return InboundLine::Message(InboundMessage::Debug {
            text: text.to_string(),
        });
    }
    if let Some(status) = line.strip_prefix(STATUS_PREFIX) {
        let status = status.strip_prefix(' ').unwrap_or(status);
        return InboundLine::Status(status.to_string());
    }
    InboundLine::Unrecognized(line.to_string())
}

fn decode_result(rest: &str) -> InboundMessage {
    let parsed = rest.split_once('|').and_then(|(index, score)| {
        let index = index.trim().parse::<i32>().ok()?;
        Some((index, parse_score(score)?))
    });
    let (index, score) = parsed.unwrap_or((NO_MATCH_INDEX, 0.0));
    InboundMessage::Result { index, score }
}

fn decode_trigger(rest: &str) -> Trigger {
    let (kind, payload) = match rest.split_once('|') {
        Some((kind, payload)) => (kind, Some(payload)),
        None => (rest, None),
    };
    let mut trigger = Trigger::empty(TriggerKind::from_wire(kind));
    let Some(payload) = payload else {
        return trigger;
    };

    if trigger.kind == TriggerKind::Shout {
        decode_shout(&mut trigger, payload);
    } else if trigger.kind.carries_form_id() {
        decode_form(&mut trigger, payload);
    } else {
        decode_plain(&mut trigger, payload);
    }
    trigger
}

/// `<plugin>|<formIdHex>|<power>|<score>|<text>`
fn decode_shout(trigger: &mut Trigger, payload: &str) {
    let fields: Vec<&str> = payload.splitn(5, '|').collect();
    let power = fields.get(2).and_then(|p| parse_power(p));

    if let TriggerTarget::Shout {
        plugin,
        form_id,
        power: slot,
    } = &mut trigger.target
    {
        *plugin = fields[0].to_string();
        if let Some(id) = fields.get(1) {
            *form_id = id.to_string();
        }
        *slot = power.unwrap_or(0);
    }
    if let Some(text) = fields.get(4) {
        trigger.text = text.to_string();
        if power.is_some() {
            trigger.score = parse_score(fields[3]).unwrap_or(0.0);
        }
    }
}

/// `<formIdHex>|<score>|<text>`
fn decode_form(trigger: &mut Trigger, payload: &str) {
    let fields: Vec<&str> = payload.splitn(3, '|').collect();
    if let TriggerTarget::Form { form_id } = &mut trigger.target {
        *form_id = fields[0].to_string();
    }
    if let Some(text) = fields.get(2) {
        trigger.text = text.to_string();
        trigger.score = parse_score(fields[1]).unwrap_or(0.0);
    }
}

/// `<score>|<text>`
fn decode_plain(trigger: &mut Trigger, payload: &str) {
    if let Some((score, text)) = payload.split_once('|') {
        trigger.text = text.to_string();
        trigger.score = parse_score(score).unwrap_or(0.0);
    }
}

fn parse_score(raw: &str) -> Option<f32> {
    raw.trim().parse::<f32>().ok().filter(|score| score.is_finite())
}

fn parse_power(raw: &str) -> Option<u8> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .filter(|power| (1..=3).contains(power))
}
