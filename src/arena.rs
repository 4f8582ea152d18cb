//! Slot based element storage with stable handles and compaction.

use std::{
    fmt,
    marker::PhantomData,
    mem,
    ops::{Index, IndexMut},
};

use stable_vec::{core::DefaultCore, iter::Indices, StableVec};

use crate::handle::{
    hsize, next_generation, Generation, Handle, Opt, FIRST_GENERATION,
};


/// Stores elements of one kind, addressed by handles of type `H`.
///
/// Removing an element leaves a hole; the index of the hole is remembered and
/// reused by the next `add` (most recently freed first). Holes are only
/// closed by [`defrag`][ElementArena::defrag], which also bumps the
/// generation of the arena and thereby invalidates all handles issued before.
///
/// Handles that are reused before compaction keep the generation of the
/// arena. Thus, an old handle to a removed element matches the element that
/// later takes its slot.
#[derive(Clone)]
pub struct ElementArena<H: Handle, T> {
    elements: StableVec<T>,
    free: Vec<usize>,
    generation: Generation,
    _handle: PhantomData<H>,
}

impl<H: Handle, T> ElementArena<H, T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: StableVec::with_capacity(capacity),
            free: Vec::new(),
            generation: FIRST_GENERATION,
            _handle: PhantomData,
        }
    }

    /// The current generation. Never
    /// [`IGNORED_GENERATION`][crate::handle::IGNORED_GENERATION].
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Returns `h` stamped with the current generation of this arena.
    #[inline(always)]
    pub fn stamp(&self, h: H) -> H {
        h.with_generation(self.generation)
    }

    /// Same as [`stamp`][ElementArena::stamp], but for optional handles.
    #[inline(always)]
    pub fn stamp_opt(&self, h: Opt<H>) -> Opt<H> {
        match h.into_option() {
            Some(h) => Opt::some(self.stamp(h)),
            None => Opt::none(),
        }
    }

    /// Inserts `elem` and returns its handle, stamped with the current
    /// generation.
    pub fn add(&mut self, elem: T) -> H {
        let idx = match self.free.pop() {
            Some(idx) => {
                self.elements.reserve_for(idx);
                self.elements.insert(idx, elem);
                idx
            }
            None => self.elements.push(elem),
        };

        H::from_usize(idx).with_generation(self.generation)
    }

    /// Returns `true` if `h` refers to a live element of the current
    /// generation (or ignores the generation).
    pub fn is_valid_handle(&self, h: H) -> bool {
        !h.is_invalid()
            && h.matches_generation(self.generation)
            && h.to_usize() < self.elements.capacity()
            && self.elements.has_element_at(h.to_usize())
    }

    pub fn get(&self, h: H) -> Option<&T> {
        if self.is_valid_handle(h) {
            self.elements.get(h.to_usize())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, h: H) -> Option<&mut T> {
        if self.is_valid_handle(h) {
            self.elements.get_mut(h.to_usize())
        } else {
            None
        }
    }

    /// Removes the element and frees its slot for reuse. Returns `None` if
    /// `h` is not valid.
    pub fn remove(&mut self, h: H) -> Option<T> {
        if !self.is_valid_handle(h) {
            return None;
        }

        let idx = h.to_usize();
        let out = self.elements.remove(idx);
        if out.is_some() {
            self.free.push(idx);
        }
        out
    }

    pub fn num_elements(&self) -> hsize {
        self.elements.num_elements() as hsize
    }

    pub fn is_empty(&self) -> bool {
        self.elements.num_elements() == 0
    }

    /// Handles of all live elements in increasing index order.
    pub fn handles(&self) -> Handles<'_, H, T> {
        Handles {
            iter: self.elements.indices(),
            generation: self.generation,
            _handle: PhantomData,
        }
    }

    /// All live elements with their handles in increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.handles().map(move |h| (h, &self.elements[h.to_usize()]))
    }

    /// Calls `f` on every live element.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(H, &mut T)) {
        let generation = self.generation;
        let indices = self.elements.indices().collect::<Vec<_>>();
        for idx in indices {
            if let Some(elem) = self.elements.get_mut(idx) {
                f(H::from_usize(idx).with_generation(generation), elem);
            }
        }
    }

    /// Moves all elements to the front, preserving their relative order, and
    /// bumps the generation.
    ///
    /// The returned table maps every handle that was live before the call to
    /// its new handle. Element contents are not touched; rewriting the handles
    /// stored inside the elements is up to the caller.
    pub fn defrag(&mut self) -> RemapTable<H> {
        let from_generation = self.generation;
        let to_generation = next_generation(from_generation);

        let indices = self.elements.indices().collect::<Vec<_>>();
        let old_len = indices.last().map(|&idx| idx + 1).unwrap_or(0);
        let mut old = mem::replace(
            &mut self.elements,
            StableVec::with_capacity(indices.len()),
        );

        let mut map = vec![Opt::none(); old_len];
        for idx in indices {
            if let Some(elem) = old.remove(idx) {
                let new_idx = self.elements.push(elem);
                map[idx] = Opt::some(H::from_usize(new_idx).with_generation(to_generation));
            }
        }

        self.free.clear();
        self.generation = to_generation;

        let len = self.elements.num_elements();
        RemapTable { map, len, from_generation }
    }
}

impl<H: Handle, T> Default for ElementArena<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle, T> Index<H> for ElementArena<H, T> {
    type Output = T;
    fn index(&self, h: H) -> &Self::Output {
        match self.get(h) {
            None => panic!(
                "{:?} was passed to the {} arena, but this {} does not exist (generation {})",
                h,
                H::KIND,
                H::KIND,
                self.generation,
            ),
            Some(r) => r,
        }
    }
}

impl<H: Handle, T> IndexMut<H> for ElementArena<H, T> {
    fn index_mut(&mut self, h: H) -> &mut Self::Output {
        let generation = self.generation;
        match self.get_mut(h) {
            None => panic!(
                "{:?} was passed to the {} arena, but this {} does not exist (generation {})",
                h,
                H::KIND,
                H::KIND,
                generation,
            ),
            Some(r) => r,
        }
    }
}

impl<H: Handle, T: fmt::Debug> fmt::Debug for ElementArena<H, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map()
            .entries(self.iter())
            .finish()
    }
}


#[derive(Debug)]
pub struct Handles<'a, H: Handle, T> {
    iter: Indices<'a, T, DefaultCore<T>>,
    generation: Generation,
    _handle: PhantomData<H>,
}

impl<'a, H: Handle, T> Iterator for Handles<'a, H, T> {
    type Item = H;
    fn next(&mut self) -> Option<Self::Item> {
        let generation = self.generation;
        self.iter.next().map(|idx| H::from_usize(idx).with_generation(generation))
    }
}


/// Maps handles from before a [`defrag`][ElementArena::defrag] to handles
/// after it.
#[derive(Clone)]
pub struct RemapTable<H: Handle> {
    map: Vec<Opt<H>>,
    len: usize,
    from_generation: Generation,
}

impl<H: Handle> RemapTable<H> {
    /// The generation of the handles this table translates.
    pub fn from_generation(&self) -> Generation {
        self.from_generation
    }

    /// Returns the new handle of the element `old` referred to, or `None` if
    /// that element did not exist or `old` is of another generation.
    pub fn get(&self, old: H) -> Option<H> {
        if old.is_invalid() || !old.matches_generation(self.from_generation) {
            return None;
        }

        self.map.get(old.to_usize()).and_then(|h| h.into_option())
    }

    /// Like [`get`][RemapTable::get], but on optional handles.
    pub fn remap(&self, old: Opt<H>) -> Opt<H> {
        match old.into_option().and_then(|h| self.get(h)) {
            Some(h) => Opt::some(h),
            None => Opt::none(),
        }
    }

    /// Number of elements that were moved.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over `(old, new)` pairs in increasing order of the old index.
    pub fn iter(&self) -> impl Iterator<Item = (H, H)> + '_ {
        let from_generation = self.from_generation;
        self.map.iter().enumerate().filter_map(move |(idx, new)| {
            new.into_option()
                .map(|new| (H::from_usize(idx).with_generation(from_generation), new))
        })
    }
}

impl<H: Handle> fmt::Debug for RemapTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map()
            .entries(self.iter())
            .finish()
    }
}
