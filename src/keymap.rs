use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::TreeAction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KeymapProfile {
    /// Arrow navigation; typing starts find.
    #[default]
    Default,
    /// hjkl navigation; `/` opens find.
    Vim,
}

/// Maps key events to [`TreeAction`]s.
///
/// Resolution depends on whether the find widget is open: while it is,
/// printable keys edit the pattern instead of navigating.
#[derive(Clone, Copy, Debug)]
pub struct TreeKeyBindings {
    profile: KeymapProfile,
}

impl Default for TreeKeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeKeyBindings {
    pub const fn new() -> Self {
        Self {
            profile: KeymapProfile::Default,
        }
    }

    pub const fn with_profile(profile: KeymapProfile) -> Self {
        Self { profile }
    }

    pub const fn profile(&self) -> KeymapProfile {
        self.profile
    }

    pub const fn set_profile(&mut self, profile: KeymapProfile) {
        self.profile = profile;
    }

    pub fn resolve<C>(&self, key: KeyEvent, find_open: bool) -> Option<TreeAction<C>> {
        if key.modifiers.contains(KeyModifiers::ALT) {
            return Self::resolve_alt(key);
        }
        if find_open && let Some(action) = Self::resolve_find(key) {
            return Some(action);
        }

        let nav_action = match self.profile {
            KeymapProfile::Default => Self::resolve_default_nav(key),
            KeymapProfile::Vim => Self::resolve_vim_nav(key),
        };
        if nav_action.is_some() {
            return nav_action;
        }

        self.resolve_common(key)
    }

    pub fn resolve_with<C, F>(&self, key: KeyEvent, find_open: bool, custom: F) -> Option<TreeAction<C>>
    where
        F: Fn(KeyEvent) -> Option<C>,
    {
        if let Some(action) = custom(key) {
            return Some(TreeAction::Custom(action));
        }

        self.resolve(key, find_open)
    }

    const fn resolve_alt<C>(key: KeyEvent) -> Option<TreeAction<C>> {
        match key.code {
            KeyCode::Char(' ') => Some(TreeAction::ToggleCollapsedRecursive),
            KeyCode::Char('m') => Some(TreeAction::ToggleFindMode),
            KeyCode::Char('f') => Some(TreeAction::ToggleFindMatchType),
            KeyCode::Up => Some(TreeAction::FindHistoryPrevious),
            KeyCode::Down => Some(TreeAction::FindHistoryNext),
            _ => None,
        }
    }

    fn resolve_find<C>(key: KeyEvent) -> Option<TreeAction<C>> {
        match key.code {
            KeyCode::Esc => Some(TreeAction::CloseFind),
            KeyCode::Backspace => Some(TreeAction::FindBackspace),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(TreeAction::FindInput(ch))
            }
            _ => None,
        }
    }

    const fn resolve_default_nav<C>(key: KeyEvent) -> Option<TreeAction<C>> {
        match key.code {
            KeyCode::Up => Some(TreeAction::FocusPrevious),
            KeyCode::Down => Some(TreeAction::FocusNext),
            KeyCode::Left => Some(TreeAction::CollapseOrFocusParent),
            KeyCode::Right => Some(TreeAction::ExpandOrFocusFirstChild),
            _ => None,
        }
    }

    const fn resolve_vim_nav<C>(key: KeyEvent) -> Option<TreeAction<C>> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(TreeAction::FocusPrevious),
            KeyCode::Down | KeyCode::Char('j') => Some(TreeAction::FocusNext),
            KeyCode::Left | KeyCode::Char('h') => Some(TreeAction::CollapseOrFocusParent),
            KeyCode::Right | KeyCode::Char('l') => Some(TreeAction::ExpandOrFocusFirstChild),
            KeyCode::Char('g') => Some(TreeAction::FocusFirst),
            KeyCode::Char('G') => Some(TreeAction::FocusLast),
            KeyCode::Char('/') => Some(TreeAction::OpenFind),
            KeyCode::Char('i') => Some(TreeAction::CycleIndentGuides),
            KeyCode::Char('s') => Some(TreeAction::FocusStickyScroll),
            _ => None,
        }
    }

    fn resolve_common<C>(&self, key: KeyEvent) -> Option<TreeAction<C>> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char(' ') => Some(TreeAction::ToggleCollapsed),
            KeyCode::Enter => Some(TreeAction::SelectFocused),
            KeyCode::Home => Some(TreeAction::FocusFirst),
            KeyCode::End => Some(TreeAction::FocusLast),
            KeyCode::PageUp => Some(TreeAction::FocusPreviousPage),
            KeyCode::PageDown => Some(TreeAction::FocusNextPage),
            KeyCode::Esc => Some(TreeAction::CloseFind),
            KeyCode::Char('f') if ctrl => Some(TreeAction::OpenFind),
            KeyCode::Char(ch) if !ctrl && self.profile == KeymapProfile::Default => {
                Some(TreeAction::FindInput(ch))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_feeds_find_in_default_profile() {
        let keys = TreeKeyBindings::new();
        assert_eq!(keys.resolve::<()>(key(KeyCode::Char('x')), false), Some(TreeAction::FindInput('x')));
        assert_eq!(keys.resolve::<()>(key(KeyCode::Char(' ')), false), Some(TreeAction::ToggleCollapsed));
        assert_eq!(keys.resolve::<()>(key(KeyCode::Char(' ')), true), Some(TreeAction::FindInput(' ')));
        assert_eq!(keys.resolve::<()>(key(KeyCode::Backspace), true), Some(TreeAction::FindBackspace));
    }

    #[test]
    fn vim_profile_navigates_with_letters() {
        let keys = TreeKeyBindings::with_profile(KeymapProfile::Vim);
        assert_eq!(keys.resolve::<()>(key(KeyCode::Char('j')), false), Some(TreeAction::FocusNext));
        assert_eq!(keys.resolve::<()>(key(KeyCode::Char('/')), false), Some(TreeAction::OpenFind));
        assert_eq!(keys.resolve::<()>(key(KeyCode::Char('x')), false), None);
        assert_eq!(keys.resolve::<()>(key(KeyCode::Char('j')), true), Some(TreeAction::FindInput('j')));
    }

    #[test]
    fn alt_space_toggles_recursively() {
        let keys = TreeKeyBindings::new();
        let event = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::ALT);
        assert_eq!(keys.resolve::<()>(event, false), Some(TreeAction::ToggleCollapsedRecursive));
    }

    #[test]
    fn custom_mapping_wins() {
        let keys = TreeKeyBindings::new();
        let action = keys.resolve_with(key(KeyCode::Char('q')), false, |event| {
            (event.code == KeyCode::Char('q')).then_some("quit")
        });
        assert_eq!(action, Some(TreeAction::Custom("quit")));
    }
}
