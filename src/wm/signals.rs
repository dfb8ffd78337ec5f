//! Change notifications
//!
//! Every setter that changes a value emits one typed signal. The stacking
//! engine and the protocol bridge react first (wired directly in the
//! window manager), then external subscribers run in registration order.

use crate::wm::client::ClientId;
use crate::wm::client_flags::ClientFlags;

/// Client attribute that can change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Ontop,
    Above,
    Below,
    Fullscreen,
    Sticky,
    Modal,
    Minimized,
    Hidden,
    SkipTaskbar,
    MaximizedHorizontal,
    MaximizedVertical,
    Urgent,
    Type,
    TransientFor,
    Desktop,
    Strut,
    Geometry,
    Title,
}

impl Property {
    pub const ALL: [Property; 18] = [
        Property::Ontop,
        Property::Above,
        Property::Below,
        Property::Fullscreen,
        Property::Sticky,
        Property::Modal,
        Property::Minimized,
        Property::Hidden,
        Property::SkipTaskbar,
        Property::MaximizedHorizontal,
        Property::MaximizedVertical,
        Property::Urgent,
        Property::Type,
        Property::TransientFor,
        Property::Desktop,
        Property::Strut,
        Property::Geometry,
        Property::Title,
    ];

    /// Boolean flag backing this property, if it is one
    pub fn flag(self) -> Option<ClientFlags> {
        Some(match self {
            Self::Ontop => ClientFlags::ONTOP,
            Self::Above => ClientFlags::ABOVE,
            Self::Below => ClientFlags::BELOW,
            Self::Fullscreen => ClientFlags::FULLSCREEN,
            Self::Sticky => ClientFlags::STICKY,
            Self::Modal => ClientFlags::MODAL,
            Self::Minimized => ClientFlags::MINIMIZED,
            Self::Hidden => ClientFlags::HIDDEN,
            Self::SkipTaskbar => ClientFlags::SKIP_TASKBAR,
            Self::MaximizedHorizontal => ClientFlags::MAXIMIZED_HORIZ,
            Self::MaximizedVertical => ClientFlags::MAXIMIZED_VERT,
            Self::Urgent => ClientFlags::URGENT,
            Self::Type
            | Self::TransientFor
            | Self::Desktop
            | Self::Strut
            | Self::Geometry
            | Self::Title => return None,
        })
    }

    /// Property backed by a single boolean flag
    pub fn from_flag(flag: ClientFlags) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.flag() == Some(flag))
    }

    /// Full signal name, as seen by the extension layer
    pub fn signal_name(self) -> &'static str {
        match self {
            Self::Ontop => "property::ontop",
            Self::Above => "property::above",
            Self::Below => "property::below",
            Self::Fullscreen => "property::fullscreen",
            Self::Sticky => "property::sticky",
            Self::Modal => "property::modal",
            Self::Minimized => "property::minimized",
            Self::Hidden => "property::hidden",
            Self::SkipTaskbar => "property::skip_taskbar",
            Self::MaximizedHorizontal => "property::maximized_horizontal",
            Self::MaximizedVertical => "property::maximized_vertical",
            Self::Urgent => "property::urgent",
            Self::Type => "property::type",
            Self::TransientFor => "property::transient_for",
            Self::Desktop => "property::desktop",
            Self::Strut => "property::struts",
            Self::Geometry => "property::geometry",
            Self::Title => "property::name",
        }
    }

    /// Whether a change can move the client between layers or toggle its
    /// visibility
    pub fn affects_stacking(self) -> bool {
        match self {
            Self::TransientFor | Self::Type | Self::Desktop => true,
            _ => self
                .flag()
                .is_some_and(|f| ClientFlags::stacking_relevant().contains(f)),
        }
    }
}

/// Everything a subscriber can listen to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Property(Property),
    Manage,
    Unmanage,
    Focus,
    Unfocus,
    Raised,
    Lowered,
    RequestClose,
}

impl Signal {
    const COUNT: usize = Property::ALL.len() + 7;

    pub fn name(self) -> &'static str {
        match self {
            Self::Property(p) => p.signal_name(),
            Self::Manage => "manage",
            Self::Unmanage => "unmanage",
            Self::Focus => "focus",
            Self::Unfocus => "unfocus",
            Self::Raised => "raised",
            Self::Lowered => "lowered",
            Self::RequestClose => "request::close",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Property(p) => p as usize,
            Self::Manage => Property::ALL.len(),
            Self::Unmanage => Property::ALL.len() + 1,
            Self::Focus => Property::ALL.len() + 2,
            Self::Unfocus => Property::ALL.len() + 3,
            Self::Raised => Property::ALL.len() + 4,
            Self::Lowered => Property::ALL.len() + 5,
            Self::RequestClose => Property::ALL.len() + 6,
        }
    }
}

/// One emitted notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEvent {
    pub signal: Signal,
    pub client: ClientId,
}

pub type Handler = Box<dyn FnMut(&SignalEvent)>;

/// Token returned by [`Notifier::connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    signal: Signal,
    serial: u64,
}

/// Ordered subscriber lists, one per signal
pub struct Notifier {
    slots: Vec<Vec<(u64, Handler)>>,
    next_serial: u64,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            slots: (0..Signal::COUNT).map(|_| Vec::new()).collect(),
            next_serial: 0,
        }
    }

    pub fn connect<F>(&mut self, signal: Signal, handler: F) -> Subscription
    where
        F: FnMut(&SignalEvent) + 'static,
    {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.slots[signal.index()].push((serial, Box::new(handler)));
        Subscription { signal, serial }
    }

    /// Returns whether the subscription was still connected
    pub fn disconnect(&mut self, subscription: Subscription) -> bool {
        let slot = &mut self.slots[subscription.signal.index()];
        let before = slot.len();
        slot.retain(|(serial, _)| *serial != subscription.serial);
        slot.len() != before
    }

    pub fn emit(&mut self, signal: Signal, client: ClientId) {
        let event = SignalEvent { signal, client };
        for (_, handler) in self.slots[signal.index()].iter_mut() {
            handler(&event);
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers: usize = self.slots.iter().map(Vec::len).sum();
        f.debug_struct("Notifier")
            .field("subscribers", &subscribers)
            .finish()
    }
}
