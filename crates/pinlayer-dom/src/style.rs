//! Inline style declarations.
//!
//! [§ 6.6 CSSStyleDeclaration](https://drafts.csswg.org/cssom/#the-cssstyledeclaration-interface)
//!
//! "A CSS declaration block is an ordered collection of CSS properties with
//! their associated values, also named CSS declarations."
//!
//! Only the subset needed to read and write an element's `style` attribute
//! is implemented. Values are kept as raw strings; nothing here parses them.

/// A single inline declaration, e.g. `top: 10px !important`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleProperty {
    /// The property name, lowercased.
    pub name: String,
    /// The raw property value.
    pub value: String,
    /// Whether the declaration carries `!important`.
    pub important: bool,
}

/// [§ 6.6](https://drafts.csswg.org/cssom/#css-declaration-blocks)
///
/// The declaration block backing an element's `style` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDeclaration {
    declarations: Vec<StyleProperty>,
}

impl StyleDeclaration {
    /// Create an empty declaration block.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            declarations: Vec::new(),
        }
    }

    /// [§ 6.6.1 setProperty()](https://drafts.csswg.org/cssom/#dom-cssstyledeclaration-setproperty)
    ///
    /// "If value is the empty string, invoke removeProperty() with property as
    /// argument and return."
    ///
    /// Otherwise the declaration is replaced (or appended) with the given
    /// priority. A non-important write replaces an important one, matching
    /// the CSSOM algorithm.
    pub fn set_property(&mut self, name: &str, value: &str, important: bool) {
        let name = name.to_ascii_lowercase();
        if value.is_empty() {
            let _ = self.remove_property(&name);
            return;
        }
        if let Some(existing) = self.declarations.iter_mut().find(|d| d.name == name) {
            existing.value = value.to_string();
            existing.important = important;
            return;
        }
        self.declarations.push(StyleProperty {
            name,
            value: value.to_string(),
            important,
        });
    }

    /// [§ 6.6.1 getPropertyValue()](https://drafts.csswg.org/cssom/#dom-cssstyledeclaration-getpropertyvalue)
    ///
    /// Returns the empty string when the property is not declared.
    #[must_use]
    pub fn property_value(&self, name: &str) -> &str {
        self.find(name).map_or("", |d| d.value.as_str())
    }

    /// [§ 6.6.1 getPropertyPriority()](https://drafts.csswg.org/cssom/#dom-cssstyledeclaration-getpropertypriority)
    #[must_use]
    pub fn is_important(&self, name: &str) -> bool {
        self.find(name).is_some_and(|d| d.important)
    }

    /// [§ 6.6.1 removeProperty()](https://drafts.csswg.org/cssom/#dom-cssstyledeclaration-removeproperty)
    ///
    /// Returns the removed value, if the property was declared.
    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        let index = self
            .declarations
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))?;
        Some(self.declarations.remove(index).value)
    }

    /// Whether no declarations are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Declarations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StyleProperty> {
        self.declarations.iter()
    }

    /// [§ 6.6.1 cssText](https://drafts.csswg.org/cssom/#dom-cssstyledeclaration-csstext)
    ///
    /// Serializes the block, e.g. `top: 0px; z-index: 3 !important;`.
    #[must_use]
    pub fn css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|d| {
                if d.important {
                    format!("{}: {} !important;", d.name, d.value)
                } else {
                    format!("{}: {};", d.name, d.value)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn find(&self, name: &str) -> Option<&StyleProperty> {
        self.declarations
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }
}
