//! Toggle buttons that switch registry filters on and off for one surface.

use std::ops::Range;

use gpui::SharedString;

use crate::{
    chain::FilterChain,
    error::ChainError,
    filters::{Filter, FilterId, FilterRegistry},
};

const MAX_ROW_LENGTH: usize = 5;

/// Association between one button and the registry entry it controls.
#[derive(Clone, Debug)]
pub struct ToggleBinding {
    pub control_id: SharedString,
    pub filter: Filter,
    pub active: bool,
}

impl ToggleBinding {
    pub fn filter_id(&self) -> FilterId {
        self.filter.id()
    }

    pub fn label(&self) -> &'static str {
        self.filter.label()
    }

    /// Flips the button and mirrors the new state onto `chain`: switching on
    /// appends the filter, switching off removes its first occurrence.
    pub fn toggle(&mut self, chain: &mut FilterChain) -> Result<bool, ChainError> {
        if self.active {
            // The button is off afterwards even if the chain had lost the filter.
            self.active = false;
            chain.remove_filter(&self.filter)?;
        } else {
            chain.add_filter(self.filter.clone());
            self.active = true;
        }
        Ok(self.active)
    }
}

/// One inactive binding per registry entry, in registry order.
pub fn bind_toggles(registry: &FilterRegistry) -> Vec<ToggleBinding> {
    registry
        .get_all_filters()
        .iter()
        .enumerate()
        .map(|(idx, filter)| ToggleBinding {
            control_id: SharedString::from(format!("filter-toggle-{idx}")),
            filter: filter.clone(),
            active: false,
        })
        .collect()
}

/// Splits `n` buttons into rows of at most five. With `n / 5 + 1` rows the
/// row length is `ceil(n / rows)`, and a row starts at every multiple of it.
pub fn toggle_rows(n: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let row_count = n / MAX_ROW_LENGTH + 1;
    let row_length = n.div_ceil(row_count);
    (0..n)
        .step_by(row_length)
        .map(|start| start..(start + row_length).min(n))
        .collect()
}
