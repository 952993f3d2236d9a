//! Partial retrieval selection for `calendar-data` (RFC 4791 §9.6).

/// Which properties of a component to keep.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PropSelection {
    /// `<allprop/>`
    All,
    /// Only the listed `<prop>` elements. Empty keeps none.
    Named(Vec<PropSelector>),
    /// No `<allprop/>` and no `<prop>` at this level; keeps every property.
    #[default]
    Unspecified,
}

/// One `<prop name="..." novalue="..."/>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropSelector {
    /// Property name, upper-cased.
    pub name: String,
    /// Keep name and parameters but blank the value.
    pub novalue: bool,
}

impl PropSelector {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            novalue: false,
        }
    }

    #[must_use]
    pub fn without_value(mut self) -> Self {
        self.novalue = true;
        self
    }
}

/// Which child components to keep.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompChildren {
    /// `<allcomp/>`
    All,
    /// Only the listed `<comp>` elements.
    Named(Vec<CompSelection>),
    /// No `<allcomp/>` and no `<comp>` at this level; keeps every child.
    #[default]
    Unspecified,
}

/// One `<comp name="...">` element and its nested selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompSelection {
    /// Component name, upper-cased.
    pub name: String,
    pub props: PropSelection,
    pub comps: CompChildren,
}

impl CompSelection {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            props: PropSelection::Unspecified,
            comps: CompChildren::Unspecified,
        }
    }

    /// Selects everything below this component.
    #[must_use]
    pub fn everything(name: impl Into<String>) -> Self {
        Self {
            props: PropSelection::All,
            comps: CompChildren::All,
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn all_props(mut self) -> Self {
        self.props = PropSelection::All;
        self
    }

    #[must_use]
    pub fn all_comps(mut self) -> Self {
        self.comps = CompChildren::All;
        self
    }

    #[must_use]
    pub fn with_prop(mut self, prop: PropSelector) -> Self {
        match &mut self.props {
            PropSelection::Named(props) => props.push(prop),
            PropSelection::All | PropSelection::Unspecified => {
                self.props = PropSelection::Named(vec![prop]);
            }
        }
        self
    }

    #[must_use]
    pub fn with_comp(mut self, comp: CompSelection) -> Self {
        match &mut self.comps {
            CompChildren::Named(comps) => comps.push(comp),
            CompChildren::All | CompChildren::Unspecified => {
                self.comps = CompChildren::Named(vec![comp]);
            }
        }
        self
    }

    /// Returns the selector for a property, if this level names it.
    #[must_use]
    pub fn find_prop(&self, name: &str) -> Option<&PropSelector> {
        match &self.props {
            PropSelection::Named(props) => props.iter().find(|p| p.name.eq_ignore_ascii_case(name)),
            PropSelection::All | PropSelection::Unspecified => None,
        }
    }

    /// Returns the nested selection for a child component, if named.
    #[must_use]
    pub fn find_comp(&self, name: &str) -> Option<&CompSelection> {
        match &self.comps {
            CompChildren::Named(comps) => comps.iter().find(|c| c.name.eq_ignore_ascii_case(name)),
            CompChildren::All | CompChildren::Unspecified => None,
        }
    }
}

/// `<calendar-data>` request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalendarDataRequest {
    /// Requested media type, normally `text/calendar`.
    pub content_type: Option<String>,
    pub version: Option<String>,
    /// `None` returns the whole object.
    pub selection: Option<CompSelection>,
}

impl CalendarDataRequest {
    /// Requests the full calendar object.
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_selection(selection: CompSelection) -> Self {
        Self {
            selection: Some(selection),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_case_insensitive() {
        let selection = CompSelection::new("vcalendar")
            .with_prop(PropSelector::new("version"))
            .with_comp(CompSelection::new("VEVENT").with_prop(PropSelector::new("summary").without_value()));

        assert_eq!(selection.name, "VCALENDAR");
        assert!(selection.find_prop("VERSION").is_some());
        let event = selection.find_comp("vevent").unwrap();
        assert!(event.find_prop("SUMMARY").unwrap().novalue);
        assert!(selection.find_comp("VTODO").is_none());
    }

    #[test]
    fn wildcards_have_no_named_entries() {
        let selection = CompSelection::everything("VCALENDAR");
        assert_eq!(selection.props, PropSelection::All);
        assert!(selection.find_prop("VERSION").is_none());
        assert_eq!(CalendarDataRequest::full().selection, None);
    }
}
