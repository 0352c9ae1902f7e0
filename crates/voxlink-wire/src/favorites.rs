//! Favorites grammar sync: the player's favorited shouts, powers, weapons,
//! spells, and potions, sent as one `FAV|BEGIN` … `FAV|END` block.

use serde::Serialize;

use crate::command::Command;
use crate::sanitize::{sanitize_field, sanitize_line};

/// A favorited shout, identified by its base form in a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShoutEntry {
    /// Plugin file name, e.g. `Skyrim.esm`.
    pub plugin: String,
    /// Base form ID, e.g. `0x00013E07`.
    pub form_id: String,
    pub name: String,
    pub editor_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PowerEntry {
    pub form_id: String,
    pub name: String,
}

/// A favorited weapon, spell, or potion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemEntry {
    pub form_id: String,
    pub name: String,
}

impl ShoutEntry {
    pub fn new(
        plugin: impl Into<String>,
        form_id: impl Into<String>,
        name: impl Into<String>,
        editor_id: impl Into<String>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            form_id: form_id.into(),
            name: name.into(),
            editor_id: editor_id.into(),
        }
    }
}

impl PowerEntry {
    pub fn new(form_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            name: name.into(),
        }
    }
}

impl ItemEntry {
    pub fn new(form_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            name: name.into(),
        }
    }
}

/// Everything the companion should build its favorites grammar from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FavoritesBatch {
    pub shouts: Vec<ShoutEntry>,
    pub powers: Vec<PowerEntry>,
    pub weapons: Vec<ItemEntry>,
    pub spells: Vec<ItemEntry>,
    pub potions: Vec<ItemEntry>,
}

impl FavoritesBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all categories.
    pub fn len(&self) -> usize {
        self.shouts.len()
            + self.powers.len()
            + self.weapons.len()
            + self.spells.len()
            + self.potions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the batch into its protocol lines.
    ///
    /// Form IDs are only made newline-safe; every other field also loses `|`.
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.len() + 2);
        lines.push("FAV|BEGIN".to_string());

        for shout in &self.shouts {
            lines.push(format!(
                "FAV|SHOUT|{}|{}|{}|{}",
                sanitize_field(&shout.plugin),
                sanitize_line(&shout.form_id),
                sanitize_field(&shout.name),
                sanitize_field(&shout.editor_id)
            ));
        }
        for power in &self.powers {
            lines.push(item_line("POWER", &power.form_id, &power.name));
        }
        for weapon in &self.weapons {
            lines.push(item_line("WEAPON", &weapon.form_id, &weapon.name));
        }
        for spell in &self.spells {
            lines.push(item_line("SPELL", &spell.form_id, &spell.name));
        }
        for potion in &self.potions {
            lines.push(item_line("POTION", &potion.form_id, &potion.name));
        }

        lines.push("FAV|END".to_string());
        lines
    }

    /// The rendered batch as an outbound command.
    pub fn to_command(&self) -> Command {
        Command::Favorites(self.render())
    }

    /// Rebuild a batch from a complete `FAV|BEGIN` … `FAV|END` block.
    ///
    /// Returns `None` unless the block is properly opened and closed. Lines
    /// inside the block that are not recognized are skipped, as the
    /// companion does.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let mut lines = lines.into_iter();
        if parse_favorite_line(lines.next()?)? != FavoriteLine::Begin {
            return None;
        }

        let mut batch = FavoritesBatch::new();
        for line in lines {
            match parse_favorite_line(line) {
                Some(FavoriteLine::End) => return Some(batch),
                Some(FavoriteLine::Shout(entry)) => batch.shouts.push(entry),
                Some(FavoriteLine::Power(entry)) => batch.powers.push(entry),
                Some(FavoriteLine::Weapon(entry)) => batch.weapons.push(entry),
                Some(FavoriteLine::Spell(entry)) => batch.spells.push(entry),
                Some(FavoriteLine::Potion(entry)) => batch.potions.push(entry),
                Some(FavoriteLine::Begin) | None => {}
            }
        }
        None
    }
}

fn item_line(kind: &str, form_id: &str, name: &str) -> String {
    format!(
        "FAV|{kind}|{}|{}",
        sanitize_line(form_id),
        sanitize_field(name)
    )
}

/// One line of a favorites block as the companion reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteLine {
    Begin,
    Shout(ShoutEntry),
    Power(PowerEntry),
    Weapon(ItemEntry),
    Spell(ItemEntry),
    Potion(ItemEntry),
    End,
}

/// Recognize a favorites line the way the companion does.
///
/// Kinds are matched case-insensitively; lines with too few fields or a
/// non-`FAV` prefix yield `None`.
pub fn parse_favorite_line(line: &str) -> Option<FavoriteLine> {
    let mut parts = line.split('|');
    if parts.next()? != "FAV" {
        return None;
    }
    let kind = parts.next()?.trim().to_ascii_uppercase();
    let fields: Vec<&str> = parts.collect();

    let item = |fields: &[&str]| -> Option<ItemEntry> {
        match fields {
            [form_id, name, ..] => Some(ItemEntry::new(*form_id, *name)),
            _ => None,
        }
    };

    match kind.as_str() {
        "BEGIN" => Some(FavoriteLine::Begin),
        "END" => Some(FavoriteLine::End),
        "SHOUT" => match fields.as_slice() {
            [plugin, form_id, name, editor_id, ..] => Some(FavoriteLine::Shout(ShoutEntry::new(
                *plugin, *form_id, *name, *editor_id,
            ))),
            _ => None,
        },
        "POWER" => item(&fields).map(|i| FavoriteLine::Power(PowerEntry::new(i.form_id, i.name))),
        "WEAPON" => item(&fields).map(FavoriteLine::Weapon),
        "SPELL" => item(&fields).map(FavoriteLine::Spell),
        "POTION" => item(&fields).map(FavoriteLine::Potion),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FavoritesBatch {
        FavoritesBatch {
            shouts: vec![
                ShoutEntry::new("Skyrim.esm", "0x00013E07", "Unrelenting Force", "UnrelentingForce"),
                ShoutEntry::new("Dawnguard.esm", "0x02007CB6", "Soul Tear", "DLC1SoulTear"),
            ],
            powers: vec![PowerEntry::new("0x000E40C8", "Dragonskin")],
            weapons: vec![ItemEntry::new("0x0001397E", "Iron Sword")],
            spells: vec![ItemEntry::new("0x00012FCD", "Flames")],
            potions: vec![ItemEntry::new("0x0003EADE", "Potion of Minor Healing")],
        }
    }

    #[test]
    fn renders_framed_block_in_category_order() {
        let lines = sample().render();
        assert_eq!(
            lines,
            vec![
                "FAV|BEGIN",
                "FAV|SHOUT|Skyrim.esm|0x00013E07|Unrelenting Force|UnrelentingForce",
                "FAV|SHOUT|Dawnguard.esm|0x02007CB6|Soul Tear|DLC1SoulTear",
                "FAV|POWER|0x000E40C8|Dragonskin",
                "FAV|WEAPON|0x0001397E|Iron Sword",
                "FAV|SPELL|0x00012FCD|Flames",
                "FAV|POTION|0x0003EADE|Potion of Minor Healing",
                "FAV|END",
            ]
        );
    }

    #[test]
    fn empty_batch_is_just_the_frame() {
        assert_eq!(FavoritesBatch::new().render(), vec!["FAV|BEGIN", "FAV|END"]);
    }

    #[test]
    fn names_lose_separator_and_newlines() {
        let batch = FavoritesBatch {
            shouts: vec![ShoutEntry::new("Mod|Pack.esp", "0x01\n", "Fus|Ro", "Ed\rId")],
            weapons: vec![ItemEntry::new("0x02", "Sword\nof|Doom")],
            ..FavoritesBatch::default()
        };
        let lines = batch.render();
        assert_eq!(lines[1], "FAV|SHOUT|Mod Pack.esp|0x01 |Fus Ro|Ed Id");
        assert_eq!(lines[2], "FAV|WEAPON|0x02|Sword of Doom");
        for line in &lines {
            assert!(!line.contains('\n') && !line.contains('\r'));
        }
    }

    #[test]
    fn rendered_lines_recognized_back_in_order() {
        let batch = sample();
        let lines = batch.render();
        let parsed: Vec<FavoriteLine> = lines
            .iter()
            .map(|l| parse_favorite_line(l).expect("every rendered line is recognized"))
            .collect();

        assert_eq!(parsed.first(), Some(&FavoriteLine::Begin));
        assert_eq!(parsed.last(), Some(&FavoriteLine::End));
        assert_eq!(parsed.len(), batch.len() + 2);
        assert_eq!(parsed[1], FavoriteLine::Shout(batch.shouts[0].clone()));
        assert_eq!(parsed[2], FavoriteLine::Shout(batch.shouts[1].clone()));
        assert_eq!(parsed[3], FavoriteLine::Power(batch.powers[0].clone()));
        assert_eq!(parsed[4], FavoriteLine::Weapon(batch.weapons[0].clone()));
        assert_eq!(parsed[5], FavoriteLine::Spell(batch.spells[0].clone()));
        assert_eq!(parsed[6], FavoriteLine::Potion(batch.potions[0].clone()));

        let rebuilt = FavoritesBatch::from_lines(lines.iter().map(String::as_str)).unwrap();
        assert_eq!(rebuilt, batch);
    }

    #[test]
    fn short_lines_not_recognized() {
        assert_eq!(parse_favorite_line("FAV|SHOUT|Skyrim.esm|0x1|Name"), None);
        assert_eq!(parse_favorite_line("FAV|POWER|0x1"), None);
        assert_eq!(parse_favorite_line("FAV|MISC|0x1|x"), None);
        assert_eq!(parse_favorite_line("LANG|en"), None);
        assert_eq!(parse_favorite_line("fav|begin"), None);
        assert_eq!(parse_favorite_line("FAV|begin"), Some(FavoriteLine::Begin));
    }

    #[test]
    fn unterminated_block_rejected() {
        assert!(FavoritesBatch::from_lines(["FAV|BEGIN", "FAV|POWER|0x1|P"]).is_none());
        assert!(FavoritesBatch::from_lines(["FAV|POWER|0x1|P", "FAV|END"]).is_none());
    }

    #[test]
    fn command_carries_rendered_lines() {
        let batch = sample();
        assert_eq!(batch.to_command(), Command::Favorites(batch.render()));
    }
}
