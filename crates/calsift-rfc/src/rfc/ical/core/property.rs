//! iCalendar property and content line types (RFC 5545 §3.1, §3.8).

use super::{Date, DateTime, Duration, Parameter, Period, Value};

/// A raw content line as tokenized from iCalendar text.
///
/// This is the low-level representation before value type resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Property name (normalized to uppercase).
    pub name: String,
    /// Parameters in order of appearance.
    pub params: Vec<Parameter>,
    /// Raw value string (after unfolding, before unescaping).
    pub raw_value: String,
}

impl ContentLine {
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        self.get_param(name)?.value()
    }

    /// Returns the VALUE parameter if present.
    #[must_use]
    pub fn value_type(&self) -> Option<&str> {
        self.get_param_value("VALUE")
    }

    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        self.get_param_value("TZID")
    }
}

/// A fully parsed iCalendar property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name (normalized to uppercase).
    pub name: String,
    /// Parameters in order of appearance.
    pub params: Vec<Parameter>,
    pub value: Value,
}

impl Property {
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            params: Vec::new(),
            value,
        }
    }

    /// Creates a property with a text value.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Value::Text(value.into()))
    }

    #[must_use]
    pub fn datetime(name: impl Into<String>, dt: DateTime) -> Self {
        let mut prop = Self::new(name, Value::DateTime(dt.clone()));
        if let Some(tzid) = dt.tzid() {
            prop.params.push(Parameter::tzid(tzid));
        }
        prop
    }

    /// Adds a parameter, builder style.
    #[must_use]
    pub fn with_param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Returns whether the name is an `X-` extension.
    #[must_use]
    pub fn is_experimental(&self) -> bool {
        self.name.starts_with("X-")
    }

    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Parameter> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn get_param_value(&self, name: &str) -> Option<&str> {
        self.get_param(name)?.value()
    }

    /// Replaces any parameter with the same name, or appends a new one.
    pub fn set_param(&mut self, param: Parameter) {
        if let Some(existing) = self.params.iter_mut().find(|p| p.name == param.name) {
            *existing = param;
        } else {
            self.params.push(param);
        }
    }

    /// Blanks the value while keeping name and parameters.
    pub fn clear_value(&mut self) {
        self.value = Value::Unknown(String::new());
    }

    /// Returns the value rendered as text, unescaped.
    #[must_use]
    pub fn value_text(&self) -> String {
        self.value.to_string()
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<&DateTime> {
        match &self.value {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<&Date> {
        match &self.value {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_duration(&self) -> Option<&Duration> {
        match &self.value {
            Value::Duration(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match &self.value {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the declared periods of a PERIOD or period-list value.
    #[must_use]
    pub fn as_periods(&self) -> &[Period] {
        match &self.value {
            Value::Period(p) => std::slice::from_ref(p),
            Value::PeriodList(list) => list,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_constructor_carries_tzid() {
        let dt = DateTime {
            form: super::super::DateTimeForm::Zoned {
                tzid: "Europe/Berlin".into(),
            },
            ..DateTime::floating(2024, 3, 1, 9, 0, 0)
        };
        let prop = Property::datetime("dtstart", dt);
        assert_eq!(prop.name, "DTSTART");
        assert_eq!(prop.get_param_value("tzid"), Some("Europe/Berlin"));
    }

    #[test]
    fn clear_value_keeps_params() {
        let mut prop = Property::text("ATTENDEE", "mailto:a@example.com")
            .with_param(Parameter::new("PARTSTAT", "ACCEPTED"));
        prop.clear_value();
        assert_eq!(prop.value_text(), "");
        assert_eq!(prop.get_param_value("PARTSTAT"), Some("ACCEPTED"));
    }

    #[test]
    fn set_param_replaces_existing() {
        let mut prop = Property::text("X-ONE", "v").with_param(Parameter::new("X-A", "1"));
        prop.set_param(Parameter::new("X-A", "2"));
        assert_eq!(prop.params.len(), 1);
        assert_eq!(prop.get_param_value("X-A"), Some("2"));
        assert!(prop.is_experimental());
    }
}
