//! Menu descriptors handed to the outer driver. The core never renders them.

use contracts::{MenuAction, MenuDescriptor, MenuItem, MenuKind, PhoneId, Verdict};

fn title(label: impl Into<String>) -> MenuItem {
    MenuItem {
        label: label.into(),
        action: None,
    }
}

fn entry(label: impl Into<String>, action: MenuAction) -> MenuItem {
    MenuItem {
        label: label.into(),
        action: Some(action),
    }
}

/// Menu shown when an idle phone is activated: hang up, or say one of the
/// phone's message variants. Selection starts on the first actionable entry.
pub fn phone_menu<'a, I>(phone: PhoneId, display_name: &str, labels: I) -> MenuDescriptor
where
    I: IntoIterator<Item = &'a str>,
{
    let mut items = vec![
        title(format!("{display_name} PHONE")),
        entry("HANG UP", MenuAction::HangUp),
    ];
    items.extend(labels.into_iter().enumerate().map(|(message, label)| {
        entry(
            format!("SAY {label}"),
            MenuAction::Say {
                message: message as u32,
            },
        )
    }));
    MenuDescriptor {
        kind: MenuKind::Phone { phone },
        items,
        selected: 1,
    }
}

pub fn terminal_menu(verdict: Verdict) -> MenuDescriptor {
    let heading = match verdict {
        Verdict::Won => "YOU WIN",
        Verdict::Lost => "YOU LOSE",
    };
    MenuDescriptor {
        kind: MenuKind::Terminal { verdict },
        items: vec![title(heading), entry("EXIT", MenuAction::Exit)],
        selected: 1,
    }
}
