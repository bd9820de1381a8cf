use ordered_float::OrderedFloat;

// Keeps the `k` closest payloads offered so far, sorted ascending by distance and then by
// sequence number. All slots start as (+inf, None) so `worst` is defined before `k` entries
// were offered.
pub struct BestK<'a, T> {
    entries: Vec<(OrderedFloat<f64>, usize, Option<&'a T>)>,
    found: usize,
}

impl<'a, T> BestK<'a, T> {
    #[must_use]
    pub fn new(k: usize) -> Self {
        BestK {
            entries: vec![(OrderedFloat(f64::INFINITY), usize::MAX, None); k],
            found: 0,
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.found >= self.entries.len()
    }

    #[must_use]
    pub fn worst(&self) -> f64 {
        self.entries
            .last()
            .map_or(f64::NEG_INFINITY, |(distance, _, _)| distance.into_inner())
    }

    pub fn offer(&mut self, distance: f64, sequence: usize, payload: &'a T) {
        let key = (OrderedFloat(distance), sequence);
        match self.entries.last() {
            None => return,
            Some((d, s, _)) if self.is_full() && key >= (*d, *s) => return,
            Some(_) => {}
        }
        let position = self.entries.partition_point(|(d, s, _)| (*d, *s) < key);
        self.entries.pop();
        self.entries.insert(position, (key.0, sequence, Some(payload)));
        self.found = (self.found + 1).min(self.entries.len());
    }

    // Sorted results without the placeholder slots.
    #[must_use]
    pub fn into_sorted_vec(self) -> Vec<(f64, &'a T)> {
        self.entries
            .into_iter()
            .filter_map(|(distance, _, payload)| payload.map(|p| (distance.into_inner(), p)))
            .collect()
    }
}
