use std::sync::{Mutex, MutexGuard, PoisonError};

use voxlink_wire::{Command, ConfigToggle};

use crate::sticky::StickyStore;

/// Everything producers want sent, behind one short-lived lock.
///
/// One-shot commands coalesce: setting one again before the engine drains
/// it replaces the earlier value.
#[derive(Debug, Default)]
pub struct Outbox {
    state: Mutex<Pending>,
}

#[derive(Debug, Default)]
struct Pending {
    sticky: StickyStore,
    dialogue_options: Option<Vec<String>>,
    close: bool,
    favorites: Option<Vec<String>>,
    listen: Option<bool>,
    listen_shouts: Option<bool>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_language(&self, code: &str) -> bool {
        self.lock().sticky.set_language(code)
    }

    pub fn set_config(&self, toggle: ConfigToggle, enabled: bool) {
        self.lock().sticky.set_toggle(toggle, enabled);
    }

    pub fn set_dialogue_options(&self, options: Vec<String>) {
        self.lock().dialogue_options = Some(options);
    }

    pub fn request_close(&self) {
        self.lock().close = true;
    }

    pub fn set_favorites(&self, lines: Vec<String>) {
        self.lock().favorites = Some(lines);
    }

    pub fn set_listen(&self, enabled: bool) {
        self.lock().listen = Some(enabled);
    }

    pub fn set_listen_shouts(&self, enabled: bool) {
        self.lock().listen_shouts = Some(enabled);
    }

    /// Current desired value of a toggle.
    pub fn config(&self, toggle: ConfigToggle) -> Option<bool> {
        self.lock().sticky.toggle(toggle)
    }

    pub fn language(&self) -> Option<String> {
        self.lock().sticky.language().map(str::to_string)
    }

    /// Everything due this cycle, in transmission order. One-shots are
    /// consumed; sticky values stay due until [`Outbox::mark_sent`].
    ///
    /// Config toggles always precede the shout-listen toggle: the companion
    /// ignores `LISTEN|SHOUTS|1` unless `CFG|SHOUTS|1` came first.
    pub fn plan_cycle(&self) -> Vec<Command> {
        let mut pending = self.lock();
        let mut plan = Vec::new();
        plan.extend(pending.sticky.due_language());
        if let Some(options) = pending.dialogue_options.take() {
            plan.push(Command::DialogueOptions(options));
        }
        if std::mem::take(&mut pending.close) {
            plan.push(Command::Close);
        }
        if let Some(lines) = pending.favorites.take() {
            plan.push(Command::Favorites(lines));
        }
        if let Some(enabled) = pending.listen.take() {
            plan.push(Command::Listen(enabled));
        }
        plan.extend(pending.sticky.due_toggles());
        if let Some(enabled) = pending.listen_shouts.take() {
            plan.push(Command::ListenShouts(enabled));
        }
        plan
    }

    /// Sticky values only; nothing is consumed.
    pub fn plan_resync(&self) -> Vec<Command> {
        self.lock().sticky.due_commands()
    }

    pub fn mark_sent(&self, command: &Command) {
        if command.is_sticky() {
            self.lock().sticky.mark_sent(command);
        }
    }

    pub fn reset_acknowledgement(&self) {
        self.lock().sticky.reset_acknowledgement();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_order_is_fixed() {
        let outbox = Outbox::new();
        outbox.set_listen_shouts(true);
        outbox.set_config(ConfigToggle::Shouts, true);
        outbox.set_listen(true);
        outbox.set_favorites(vec!["FAV|BEGIN".into(), "FAV|END".into()]);
        outbox.request_close();
        outbox.set_dialogue_options(vec!["Bye".into()]);
        outbox.set_language("en");
        outbox.set_config(ConfigToggle::Open, true);

        let labels: Vec<_> = outbox.plan_cycle().iter().map(Command::label).collect();
        assert_eq!(
            labels,
            ["LANG", "OPEN", "CLOSE", "FAV", "LISTEN", "CFG", "CFG", "LISTEN|SHOUTS"]
        );
    }

    #[test]
    fn one_shots_coalesce_and_drain_once() {
        let outbox = Outbox::new();
        outbox.set_dialogue_options(vec!["first".into()]);
        outbox.set_dialogue_options(vec!["second".into(), "third".into()]);
        outbox.request_close();
        outbox.request_close();

        assert_eq!(
            outbox.plan_cycle(),
            vec![
                Command::DialogueOptions(vec!["second".into(), "third".into()]),
                Command::Close,
            ]
        );
        assert!(outbox.plan_cycle().is_empty());
    }

    #[test]
    fn sticky_values_stay_due_until_marked() {
        let outbox = Outbox::new();
        outbox.set_config(ConfigToggle::Debug, true);

        let first = outbox.plan_cycle();
        assert_eq!(first, vec![Command::Config(ConfigToggle::Debug, true)]);
        assert_eq!(outbox.plan_cycle(), first, "unsent toggle remains due");

        outbox.mark_sent(&first[0]);
        assert!(outbox.plan_cycle().is_empty());
        assert_eq!(outbox.config(ConfigToggle::Debug), Some(true));
    }

    #[test]
    fn resync_plan_leaves_one_shots_alone() {
        let outbox = Outbox::new();
        outbox.set_language("sv");
        outbox.set_listen(true);
        outbox.set_config(ConfigToggle::Powers, false);

        assert_eq!(
            outbox.plan_resync(),
            vec![
                Command::Language("sv".into()),
                Command::Config(ConfigToggle::Powers, false),
            ]
        );
        assert!(outbox.plan_cycle().contains(&Command::Listen(true)));
    }

    #[test]
    fn reset_acknowledgement_makes_sticky_due() {
        let outbox = Outbox::new();
        outbox.set_config(ConfigToggle::Shouts, true);
        for command in outbox.plan_cycle() {
            outbox.mark_sent(&command);
        }
        assert!(outbox.plan_resync().is_empty());

        outbox.reset_acknowledgement();
        assert_eq!(
            outbox.plan_resync(),
            vec![Command::Config(ConfigToggle::Shouts, true)]
        );
        assert_eq!(outbox.language(), None);
    }
}
