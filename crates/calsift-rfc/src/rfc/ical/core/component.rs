//! iCalendar component tree (RFC 5545 §3.4-3.6).
//!
//! All components of one calendar live in an arena owned by [`ICalendar`].
//! Parent and child links are [`ComponentId`] indices, so removing or
//! grafting subtrees never leaves a dangling reference.

use super::Property;

/// Component kind for iCalendar.
///
/// Well-known kinds get their own variant; anything else keeps its original
/// (upper-cased) token so it can still be addressed by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Calendar,
    Event,
    Todo,
    Journal,
    FreeBusy,
    Timezone,
    Alarm,
    Standard,
    Daylight,
    /// `X-` or IANA-registered component not modeled above.
    Other(String),
}

impl ComponentKind {
    /// Returns the iCalendar name for this component kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Calendar => "VCALENDAR",
            Self::Event => "VEVENT",
            Self::Todo => "VTODO",
            Self::Journal => "VJOURNAL",
            Self::FreeBusy => "VFREEBUSY",
            Self::Timezone => "VTIMEZONE",
            Self::Alarm => "VALARM",
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
            Self::Other(name) => name,
        }
    }

    /// Parses a component kind from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "VCALENDAR" => Self::Calendar,
            "VEVENT" => Self::Event,
            "VTODO" => Self::Todo,
            "VJOURNAL" => Self::Journal,
            "VFREEBUSY" => Self::FreeBusy,
            "VTIMEZONE" => Self::Timezone,
            "VALARM" => Self::Alarm,
            "STANDARD" => Self::Standard,
            "DAYLIGHT" => Self::Daylight,
            _ => Self::Other(upper),
        }
    }

    /// Returns whether `name` designates this kind.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(name)
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a component inside its owning [`ICalendar`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(usize);

/// An iCalendar component node.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub kind: ComponentKind,
    /// Properties in order of appearance.
    pub properties: Vec<Property>,
    children: Vec<ComponentId>,
    parent: Option<ComponentId>,
}

impl Component {
    fn new(kind: ComponentKind, parent: Option<ComponentId>) -> Self {
        Self {
            kind,
            properties: Vec::new(),
            children: Vec::new(),
            parent,
        }
    }

    /// Child components in order of appearance.
    #[must_use]
    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    #[must_use]
    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn add_property(&mut self, prop: Property) {
        self.properties.push(prop);
    }

    /// Returns the first property with the given name.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns all properties with the given name.
    pub fn get_properties<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns whether any property with the given name exists.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.get_property(name).is_some()
    }

    /// Returns the text value of the first property with the given name.
    #[must_use]
    pub fn text_of(&self, name: &str) -> Option<&str> {
        self.get_property(name)?.as_text()
    }

    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.text_of("UID")
    }
}

/// A parsed or synthesized calendar: an arena of components with one root.
#[derive(Debug, Clone, PartialEq)]
pub struct ICalendar {
    components: Vec<Component>,
    root: ComponentId,
}

impl Default for ICalendar {
    fn default() -> Self {
        Self::with_root(ComponentKind::Calendar)
    }
}

impl ICalendar {
    /// Creates an empty VCALENDAR with VERSION and PRODID set.
    #[must_use]
    pub fn new(prodid: &str) -> Self {
        let mut cal = Self::default();
        let root = cal.root_mut();
        root.add_property(Property::text("VERSION", "2.0"));
        root.add_property(Property::text("PRODID", prodid));
        cal
    }

    /// Creates a calendar whose root has the given kind and no properties.
    #[must_use]
    pub fn with_root(kind: ComponentKind) -> Self {
        Self {
            components: vec![Component::new(kind, None)],
            root: ComponentId(0),
        }
    }

    #[must_use]
    pub fn root(&self) -> ComponentId {
        self.root
    }

    #[must_use]
    pub fn root_component(&self) -> &Component {
        self.get(self.root)
    }

    pub fn root_mut(&mut self) -> &mut Component {
        let root = self.root;
        self.get_mut(root)
    }

    /// Returns the component with the given id.
    ///
    /// Ids are only handed out by this arena, so lookups always resolve.
    #[must_use]
    pub fn get(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    pub fn get_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.components[id.0]
    }

    /// Appends a new, empty child of `kind` under `parent`.
    pub fn add_child(&mut self, parent: ComponentId, kind: ComponentKind) -> ComponentId {
        let id = ComponentId(self.components.len());
        self.components.push(Component::new(kind, Some(parent)));
        self.components[parent.0].children.push(id);
        id
    }

    /// Unlinks `child` from `parent`. The node stays in the arena but is no
    /// longer reachable from the root.
    pub fn detach(&mut self, parent: ComponentId, child: ComponentId) {
        self.components[parent.0].children.retain(|c| *c != child);
    }

    /// Iterates the ids of the children of `id` of the given kind.
    pub fn children_of_kind<'a>(
        &'a self,
        id: ComponentId,
        kind: &'a ComponentKind,
    ) -> impl Iterator<Item = ComponentId> + 'a {
        self.get(id)
            .children
            .iter()
            .copied()
            .filter(move |c| self.get(*c).kind == *kind)
    }

    /// Iterates `id` followed by its ancestors up to the root.
    pub fn ancestors_inclusive(&self, id: ComponentId) -> impl Iterator<Item = ComponentId> + '_ {
        std::iter::successors(Some(id), |c| self.get(*c).parent)
    }

    /// Returns every reachable component, depth-first in document order.
    #[must_use]
    pub fn descendants(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.get(next).children.iter().rev().copied());
        }
        out
    }

    /// Finds the VTIMEZONE with the given TZID visible from `id`.
    ///
    /// Walks from `id` towards the root and inspects the VTIMEZONE children
    /// at every level.
    #[must_use]
    pub fn find_timezone(&self, id: ComponentId, tzid: &str) -> Option<ComponentId> {
        self.ancestors_inclusive(id).find_map(|ancestor| {
            self.children_of_kind(ancestor, &ComponentKind::Timezone)
                .find(|tz| self.get(*tz).text_of("TZID") == Some(tzid))
        })
    }

    /// Deep-copies the subtree `source_id` of `source` under `parent`.
    pub fn graft(
        &mut self,
        parent: ComponentId,
        source: &ICalendar,
        source_id: ComponentId,
    ) -> ComponentId {
        let node = source.get(source_id);
        let id = self.add_child(parent, node.kind.clone());
        self.get_mut(id).properties.clone_from(&node.properties);
        for child in &node.children {
            self.graft(id, source, *child);
        }
        id
    }

    /// Grafts every child of `other`'s root under this calendar's root.
    pub fn merge(&mut self, other: &ICalendar) {
        let root = self.root;
        for child in &other.root_component().children {
            self.graft(root, other, *child);
        }
    }

    /// Rebuilds the arena keeping only components reachable from the root.
    #[must_use]
    pub fn compact(&self) -> Self {
        let mut out = Self::with_root(self.root_component().kind.clone());
        out.root_mut()
            .properties
            .clone_from(&self.root_component().properties);
        let root = out.root;
        for child in &self.root_component().children {
            out.graft(root, self, *child);
        }
        out
    }

    /// Number of components reachable from the root, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descendants(self.root).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root_component().children.is_empty() && self.root_component().properties.is_empty()
    }
}

/// Merges several calendars into one by grafting every root's children
/// under the first root.
///
/// Returns `None` for an empty input.
#[must_use]
pub fn merge_calendars<'a>(calendars: impl IntoIterator<Item = &'a ICalendar>) -> Option<ICalendar> {
    let mut iter = calendars.into_iter();
    let mut merged = iter.next()?.compact();
    for cal in iter {
        merged.merge(cal);
    }
    Some(merged)
}
