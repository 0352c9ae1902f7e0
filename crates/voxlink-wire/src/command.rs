use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::WireError;
use crate::sanitize::sanitize_line;

/// Sticky boolean settings mirrored to the companion as `CFG|<NAME>|<0|1>`.
///
/// Declaration order is the transmission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigToggle {
    /// Voice-activated dialogue opening.
    Open,
    /// Voice-activated dialogue closing.
    Close,
    Shouts,
    Debug,
    SaveWav,
    DialogueSelect,
    Weapons,
    Spells,
    Powers,
    Potions,
}

impl ConfigToggle {
    pub const COUNT: usize = 10;

    /// Every toggle, in transmission order.
    pub const ALL: [ConfigToggle; Self::COUNT] = [
        ConfigToggle::Open,
        ConfigToggle::Close,
        ConfigToggle::Shouts,
        ConfigToggle::Debug,
        ConfigToggle::SaveWav,
        ConfigToggle::DialogueSelect,
        ConfigToggle::Weapons,
        ConfigToggle::Spells,
        ConfigToggle::Powers,
        ConfigToggle::Potions,
    ];

    /// Name used in the `CFG` line.
    pub fn wire_name(self) -> &'static str {
        match self {
            ConfigToggle::Open => "OPEN",
            ConfigToggle::Close => "CLOSE",
            ConfigToggle::Shouts => "SHOUTS",
            ConfigToggle::Debug => "DEBUG",
            ConfigToggle::SaveWav => "SAVE_WAV",
            ConfigToggle::DialogueSelect => "DIALOGUE_SELECT",
            ConfigToggle::Weapons => "WEAPONS",
            ConfigToggle::Spells => "SPELLS",
            ConfigToggle::Powers => "POWERS",
            ConfigToggle::Potions => "POTIONS",
        }
    }

    /// Human-facing setting name (CLI flags, logs).
    pub fn setting_name(self) -> &'static str {
        match self {
            ConfigToggle::Open => "voice-open",
            ConfigToggle::Close => "voice-close",
            ConfigToggle::Shouts => "shouts",
            ConfigToggle::Debug => "debug",
            ConfigToggle::SaveWav => "save-wav",
            ConfigToggle::DialogueSelect => "dialogue-select",
            ConfigToggle::Weapons => "weapons",
            ConfigToggle::Spells => "spells",
            ConfigToggle::Powers => "powers",
            ConfigToggle::Potions => "potions",
        }
    }

    /// Position in [`ConfigToggle::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ConfigToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.setting_name())
    }
}

impl FromStr for ConfigToggle {
    type Err = WireError;

    /// Accepts either the setting name or the wire name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ConfigToggle::ALL
            .into_iter()
            .find(|toggle| {
                toggle.setting_name().eq_ignore_ascii_case(wanted)
                    || toggle.wire_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| WireError::UnknownToggle(s.to_string()))
    }
}

/// One outbound unit of work. Multi-line commands are written as a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `LANG|<code>`
    Language(String),
    /// `OPEN|<count>`, one `OPT|<text>` per option, then `END`.
    DialogueOptions(Vec<String>),
    /// `CLOSE`
    Close,
    /// Pre-rendered `FAV|...` lines, see [`crate::FavoritesBatch::render`].
    Favorites(Vec<String>),
    /// `LISTEN|<0|1>`
    Listen(bool),
    /// `LISTEN|SHOUTS|<0|1>`
    ListenShouts(bool),
    /// `CFG|<NAME>|<0|1>`
    Config(ConfigToggle, bool),
}

impl Command {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Command::Language(_) => "LANG",
            Command::DialogueOptions(_) => "OPEN",
            Command::Close => "CLOSE",
            Command::Favorites(_) => "FAV",
            Command::Listen(_) => "LISTEN",
            Command::ListenShouts(_) => "LISTEN|SHOUTS",
            Command::Config(..) => "CFG",
        }
    }

    /// Sticky commands are resent after every reconnect.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Command::Language(_) | Command::Config(..))
    }

    /// The protocol lines for this command, without terminators.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.for_each_line(|line| lines.push(line.to_string()));
        lines
    }

    pub(crate) fn for_each_line(&self, mut emit: impl FnMut(&str)) {
        match self {
            Command::Language(code) => emit(&format!("LANG|{}", sanitize_line(code))),
            Command::DialogueOptions(options) => {
                emit(&format!("OPEN|{}", options.len()));
                for option in options {
                    emit(&format!("OPT|{}", sanitize_line(option)));
                }
                emit("END");
            }
            Command::Close => emit("CLOSE"),
            Command::Favorites(lines) => {
                for line in lines {
                    emit(&sanitize_line(line));
                }
            }
            Command::Listen(on) => emit(&format!("LISTEN|{}", flag(*on))),
            Command::ListenShouts(on) => emit(&format!("LISTEN|SHOUTS|{}", flag(*on))),
            Command::Config(toggle, on) => {
                emit(&format!("CFG|{}|{}", toggle.wire_name(), flag(*on)))
            }
        }
    }
}

fn flag(on: bool) -> char {
    if on {
        '1'
    } else {
        '0'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_lines_use_wire_names() {
        assert_eq!(
            Command::Config(ConfigToggle::SaveWav, true).lines(),
            vec!["CFG|SAVE_WAV|1"]
        );
        assert_eq!(
            Command::Config(ConfigToggle::DialogueSelect, false).lines(),
            vec!["CFG|DIALOGUE_SELECT|0"]
        );
    }

    #[test]
    fn toggle_order_is_fixed() {
        let names: Vec<_> = ConfigToggle::ALL.iter().map(|t| t.wire_name()).collect();
        assert_eq!(
            names,
            [
                "OPEN",
                "CLOSE",
                "SHOUTS",
                "DEBUG",
                "SAVE_WAV",
                "DIALOGUE_SELECT",
                "WEAPONS",
                "SPELLS",
                "POWERS",
                "POTIONS"
            ]
        );
        for (i, toggle) in ConfigToggle::ALL.iter().enumerate() {
            assert_eq!(toggle.index(), i);
        }
    }

    #[test]
    fn dialogue_options_block() {
        let cmd = Command::DialogueOptions(vec![
            "What news?".to_string(),
            "Line one\nline two".to_string(),
            "A|B".to_string(),
        ]);
        assert_eq!(
            cmd.lines(),
            vec![
                "OPEN|3",
                "OPT|What news?",
                "OPT|Line one line two",
                "OPT|A|B",
                "END"
            ]
        );
    }

    #[test]
    fn empty_dialogue_options_still_framed() {
        assert_eq!(
            Command::DialogueOptions(Vec::new()).lines(),
            vec!["OPEN|0", "END"]
        );
    }

    #[test]
    fn listen_lines() {
        assert_eq!(Command::Listen(true).lines(), vec!["LISTEN|1"]);
        assert_eq!(Command::ListenShouts(false).lines(), vec!["LISTEN|SHOUTS|0"]);
        assert_eq!(Command::Close.lines(), vec!["CLOSE"]);
    }

    #[test]
    fn language_is_newline_safe() {
        assert_eq!(
            Command::Language("en\r\n".to_string()).lines(),
            vec!["LANG|en  "]
        );
    }

    #[test]
    fn toggle_parses_setting_and_wire_names() {
        assert_eq!("shouts".parse::<ConfigToggle>().unwrap(), ConfigToggle::Shouts);
        assert_eq!("SAVE_WAV".parse::<ConfigToggle>().unwrap(), ConfigToggle::SaveWav);
        assert_eq!(
            "Dialogue-Select".parse::<ConfigToggle>().unwrap(),
            ConfigToggle::DialogueSelect
        );
        assert!(matches!(
            "volume".parse::<ConfigToggle>(),
            Err(WireError::UnknownToggle(_))
        ));
    }

    #[test]
    fn stickiness() {
        assert!(Command::Language("en".into()).is_sticky());
        assert!(Command::Config(ConfigToggle::Debug, true).is_sticky());
        assert!(!Command::ListenShouts(true).is_sticky());
        assert!(!Command::Close.is_sticky());
    }
}
