use dioxus::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BentoVariant {
    #[default]
    Default,
    Cultural,
    Fresh,
    Warm,
}

impl BentoVariant {
    pub fn class(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Cultural => "bento-card-cultural",
            Self::Fresh => "bento-card-fresh",
            Self::Warm => "bento-card-warm",
        }
    }
}

/// Padding scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BentoSize {
    Sm,
    #[default]
    Md,
    Lg,
    Xl,
}

impl BentoSize {
    pub fn class(self) -> &'static str {
        match self {
            Self::Sm => "p-4",
            Self::Md => "p-6",
            Self::Lg => "p-8",
            Self::Xl => "p-10",
        }
    }
}

pub(crate) fn card_classes(
    variant: BentoVariant,
    size: BentoSize,
    clickable: bool,
    extra: &str,
) -> String {
    let interactive = if clickable { "bento-card-clickable" } else { "" };
    ["bento-card", variant.class(), size.class(), interactive, extra]
        .into_iter()
        .filter(|class| !class.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keys that activate a clickable card from the keyboard.
pub(crate) fn activates(key: &Key) -> bool {
    match key {
        Key::Enter => true,
        Key::Character(c) => c == " ",
        _ => false,
    }
}

/// Rounded card of the bento grid.
///
/// With `onclick` set it renders as a focusable `button` that Enter and Space
/// activate; otherwise as a plain `div`.
#[component]
pub fn BentoCard(
    #[props(default)] variant: BentoVariant,
    #[props(default)] size: BentoSize,
    #[props(default)] class: String,
    #[props(default)] aria_label: Option<String>,
    onclick: Option<EventHandler<()>>,
    children: Element,
) -> Element {
    let classes = card_classes(variant, size, onclick.is_some(), &class);

    match onclick {
        Some(handler) => rsx! {
            button {
                r#type: "button",
                class: "{classes}",
                role: "button",
                tabindex: "0",
                aria_label,
                onclick: move |_| handler.call(()),
                onkeydown: move |evt: KeyboardEvent| {
                    if activates(&evt.key()) {
                        evt.prevent_default();
                        handler.call(());
                    }
                },
                {children}
            }
        },
        None => rsx! {
            div {
                class: "{classes}",
                aria_label,
                {children}
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_classes() {
        assert_eq!(
            card_classes(BentoVariant::Default, BentoSize::Md, false, ""),
            "bento-card p-6"
        );
        assert_eq!(
            card_classes(BentoVariant::Cultural, BentoSize::Lg, true, "max-w-md mx-auto"),
            "bento-card bento-card-cultural p-8 bento-card-clickable max-w-md mx-auto"
        );
    }

    #[test]
    fn test_enter_and_space_activate() {
        assert!(activates(&Key::Enter));
        assert!(activates(&Key::Character(" ".to_string())));
        assert!(!activates(&Key::Character("a".to_string())));
        assert!(!activates(&Key::Tab));
    }
}
