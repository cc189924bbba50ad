use crate::{
    error::{ChainError, FilterError},
    filters::Filter,
    types::Frame,
};

/// Ordered list of active filters for one display surface.
///
/// Filters run left to right, each consuming the previous output, so a
/// filter that changes the channel count (grayscale, edges) changes what the
/// next one receives. The chain does no locking of its own; it belongs to a
/// single surface and is only touched from that surface's thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `filter`; it runs last on the next frame. Duplicates are allowed.
    pub fn add_filter(&mut self, filter: Filter) {
        log::debug!("chain += {filter}");
        self.filters.push(filter);
    }

    /// Removes the first occurrence of `filter` (by identity).
    pub fn remove_filter(&mut self, filter: &Filter) -> Result<(), ChainError> {
        let idx = self
            .filters
            .iter()
            .position(|f| f == filter)
            .ok_or(ChainError::NotFound {
                label: filter.label(),
            })?;
        self.filters.remove(idx);
        log::debug!("chain -= {filter}");
        Ok(())
    }

    pub fn apply_all(&self, frame: Frame) -> Result<Frame, FilterError> {
        self.filters
            .iter()
            .try_fold(frame, |working, filter| filter.apply(working))
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn contains(&self, filter: &Filter) -> bool {
        self.filters.contains(filter)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }
}

impl FromIterator<Filter> for FilterChain {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        filters::{FilterId, FilterRegistry, test_registry},
        types::test_util::{gradient_frame, gray_gradient_frame},
    };

    fn pick(registry: &FilterRegistry, id: FilterId) -> Filter {
        registry.find(id).unwrap()
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = FilterChain::new();
        let frame = gradient_frame(30, 20);
        assert_eq!(chain.apply_all(frame.clone()).unwrap(), frame);
    }

    #[test]
    fn composes_left_to_right() {
        let registry = test_registry();
        let x = pick(&registry, FilterId::Pixelated);
        let y = pick(&registry, FilterId::ChannelSwap);
        let frame = gradient_frame(40, 40);

        let chain: FilterChain = [x.clone(), y.clone()].into_iter().collect();
        let expected = y.apply(x.apply(frame.clone()).unwrap()).unwrap();
        assert_eq!(chain.apply_all(frame.clone()).unwrap(), expected);

        let flip = pick(&registry, FilterId::VerticalFlip);
        let gray = pick(&registry, FilterId::Grayscale);
        let chain: FilterChain = [flip.clone(), gray.clone()].into_iter().collect();
        let expected = gray.apply(flip.apply(frame.clone()).unwrap()).unwrap();
        assert_eq!(chain.apply_all(frame).unwrap(), expected);
    }

    #[test]
    fn add_then_remove_restores_sequence() {
        let registry = test_registry();
        let mut chain: FilterChain = [
            pick(&registry, FilterId::Grayscale),
            pick(&registry, FilterId::Negative),
        ]
        .into_iter()
        .collect();
        let before = chain.clone();

        let sobel = pick(&registry, FilterId::Sobel);
        chain.add_filter(sobel.clone());
        assert_eq!(chain.filters().last(), Some(&sobel));
        chain.remove_filter(&sobel).unwrap();
        assert_eq!(chain, before);
    }

    #[test]
    fn removing_absent_filter_is_not_found() {
        let registry = test_registry();
        let mut chain: FilterChain = [pick(&registry, FilterId::Grayscale)].into_iter().collect();
        let before = chain.clone();

        let err = chain
            .remove_filter(&pick(&registry, FilterId::Edges))
            .unwrap_err();
        assert_eq!(err, ChainError::NotFound { label: "Edges" });
        assert_eq!(chain, before);
    }

    #[test]
    fn remove_takes_first_duplicate_only() {
        let registry = test_registry();
        let neg = pick(&registry, FilterId::Negative);
        let gray = pick(&registry, FilterId::Grayscale);
        let mut chain: FilterChain = [neg.clone(), gray.clone(), neg.clone()].into_iter().collect();

        chain.remove_filter(&neg).unwrap();
        assert_eq!(chain.filters(), &[gray, neg.clone()]);
        assert!(chain.contains(&neg));
    }

    #[test]
    fn grayscale_chain_yields_single_channel() {
        let registry = test_registry();
        let chain: FilterChain = [pick(&registry, FilterId::Grayscale)].into_iter().collect();
        let out = chain.apply_all(gradient_frame(100, 100)).unwrap();
        assert_eq!(out.channels(), 1);
        assert_eq!(out.dimensions(), (100, 100));
    }

    #[test]
    fn grayscale_then_edges_yields_binary_map() {
        let registry = test_registry();
        let chain: FilterChain = [
            pick(&registry, FilterId::Grayscale),
            pick(&registry, FilterId::Edges),
        ]
        .into_iter()
        .collect();

        let out = chain.apply_all(gradient_frame(80, 60)).unwrap();
        assert_eq!(out.dimensions(), (80, 60));
        let Frame::Gray(edges) = out else {
            panic!("expected gray output");
        };
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn double_negative_is_identity() {
        let registry = test_registry();
        let neg = pick(&registry, FilterId::Negative);
        let chain: FilterChain = [neg.clone(), neg].into_iter().collect();

        for frame in [gradient_frame(33, 21), gray_gradient_frame(12, 7)] {
            assert_eq!(chain.apply_all(frame.clone()).unwrap(), frame);
        }
    }
}
