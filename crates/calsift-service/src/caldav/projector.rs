//! Partial retrieval of calendar data (RFC 4791 §9.6).

use calsift_rfc::rfc::dav::core::{CompChildren, CompSelection, PropSelection};
use calsift_rfc::rfc::ical::core::{ComponentId, ICalendar};

/// ## Summary
/// Prunes a copy of `cal` to the shape `selection` describes.
///
/// At each level, properties and child components not named in the
/// selection are removed unless the level uses a wildcard or names nothing.
/// Properties selected with `novalue` keep their name and parameters with an
/// empty value. The input is never modified, and projecting an already
/// projected calendar with the same selection changes nothing.
#[tracing::instrument(skip_all, fields(selection = %selection.name))]
#[must_use]
pub fn project(cal: &ICalendar, selection: &CompSelection) -> ICalendar {
    let mut projected = cal.clone();
    let root = projected.root();
    if !projected.get(root).kind.is_named(&selection.name) {
        tracing::debug!(root = %projected.get(root).kind, "Selection does not name the root");
    }
    prune(&mut projected, root, selection);
    projected.compact()
}

fn prune(cal: &mut ICalendar, id: ComponentId, selection: &CompSelection) {
    if let PropSelection::Named(_) = &selection.props {
        let component = cal.get_mut(id);
        component
            .properties
            .retain(|prop| selection.find_prop(&prop.name).is_some());
        for prop in &mut component.properties {
            if selection.find_prop(&prop.name).is_some_and(|s| s.novalue) {
                prop.clear_value();
            }
        }
    }

    if let CompChildren::Named(_) = &selection.comps {
        let children = cal.get(id).children().to_vec();
        for child in children {
            let kind = cal.get(child).kind.as_str().to_owned();
            match selection.find_comp(&kind) {
                Some(nested) => prune(cal, child, nested),
                None => {
                    tracing::trace!(component = %kind, "Dropped by selection");
                    cal.detach(id, child);
                }
            }
        }
    }
}
