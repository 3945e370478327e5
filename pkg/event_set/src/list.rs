use crate::record::OperationRecord;

/// Identifies one live slot inside an `EventList`. Never exposed past this
/// crate's own modules: callers of `EventSet` only ever see counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RecordId(usize);

/// What an `iter_with_remove` visitor decided to do with the record it was
/// just handed.
pub(crate) enum Disposition {
    /// Leave the record where it is and keep walking.
    Keep,
    /// The visitor already unlinked the record (through the `&mut
    /// EventList` it was handed). Traversal continues from the slot
    /// recorded before the visitor ran.
    Unlinked,
    /// End the traversal immediately.
    Stop,
}

struct Slot<Token> {
    record: Option<OperationRecord<Token>>,
    prev: Option<RecordId>,
    next: Option<RecordId>,
}

/// An intrusive-style doubly-linked list of operation records, sentinel-free
/// (`head`/`tail` are plain `Option`s rather than a dummy node).
///
/// Links live in `slots`, addressed by `RecordId`, rather than as raw
/// pointers embedded in the record itself: moving a record between the
/// active and failed lists (the wait engine's bread and butter) is then
/// just a `remove` from one list followed by an `append` to the other, each
/// O(1), with no unsafe code and no risk of a dangling pointer outliving
/// its record.
pub(crate) struct EventList<Token> {
    slots: Vec<Slot<Token>>,
    free: Vec<RecordId>,
    head: Option<RecordId>,
    tail: Option<RecordId>,
    len: usize,
}

impl<Token> EventList<Token> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn head(&self) -> Option<RecordId> {
        self.head
    }

    pub(crate) fn get(&self, id: RecordId) -> &OperationRecord<Token> {
        self.slots[id.0].record.as_ref().expect("dangling RecordId")
    }

    pub(crate) fn get_mut(&mut self, id: RecordId) -> &mut OperationRecord<Token> {
        self.slots[id.0].record.as_mut().expect("dangling RecordId")
    }

    /// Places `record` at the tail. O(1).
    pub(crate) fn append(&mut self, record: OperationRecord<Token>) -> RecordId {
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.slots.push(Slot {
                    record: None,
                    prev: None,
                    next: None,
                });
                RecordId(self.slots.len() - 1)
            }
        };

        self.slots[id.0] = Slot {
            record: Some(record),
            prev: self.tail,
            next: None,
        };

        match self.tail {
            Some(tail) => self.slots[tail.0].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;

        id
    }

    /// Detaches `id` and returns its record without freeing it. O(1).
    /// Panics if `id` does not refer to a live member of this list.
    pub(crate) fn remove(&mut self, id: RecordId) -> OperationRecord<Token> {
        let (prev, next) = {
            let slot = &self.slots[id.0];
            (slot.prev, slot.next)
        };

        match prev {
            Some(prev) => self.slots[prev.0].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next.0].prev = prev,
            None => self.tail = prev,
        }

        let slot = &mut self.slots[id.0];
        slot.prev = None;
        slot.next = None;
        let record = slot.record.take().expect("dangling RecordId");

        self.free.push(id);
        self.len -= 1;

        record
    }

    /// Walks the list in insertion order, letting `visit` decide the fate of
    /// each record it is handed.
    ///
    /// The next slot is captured before `visit` runs, so a visitor that
    /// unlinks the current record (by calling `remove` on the `&mut
    /// EventList` it receives) does not break traversal. The tail at entry
    /// is captured too (`boundary`): a record appended to this same list
    /// from inside `visit` is linked in after `boundary`, so the walk stops
    /// once `boundary` itself has been visited rather than trusting its
    /// `next` pointer, which an append during the walk may have just
    /// rewritten to point at the new record. Without this, a record
    /// appended while visiting an earlier node would get spliced into the
    /// chain still being traversed and would be visited in the same call.
    pub(crate) fn iter_with_remove<F>(&mut self, mut visit: F)
    where
        F: FnMut(&mut EventList<Token>, RecordId) -> Disposition,
    {
        let boundary = self.tail;
        let mut cur = self.head;
        while let Some(id) = cur {
            let next = self.slots[id.0].next;
            let at_boundary = boundary == Some(id);
            let disposition = visit(self, id);
            cur = next;
            if let Disposition::Stop = disposition {
                break;
            }
            if at_boundary {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AppSite;

    fn rec(n: u64) -> OperationRecord<u32> {
        OperationRecord::new(
            n,
            format!("op{}", n),
            AppSite::new("test.rs", "f", 1),
            "1.0.0".into(),
            0,
            n as u32,
        )
    }

    #[test]
    fn append_and_remove_preserve_order() {
        let mut list = EventList::new();
        list.append(rec(0));
        let b = list.append(rec(1));
        list.append(rec(2));
        assert_eq!(list.len(), 3);

        let removed = list.remove(b);
        assert_eq!(removed.counter(), 1);
        assert_eq!(list.len(), 2);

        let mut seen = Vec::new();
        list.iter_with_remove(|list, id| {
            seen.push(list.get(id).counter());
            Disposition::Keep
        });
        assert_eq!(seen, vec![0, 2]);
    }

    #[test]
    fn iter_with_remove_skips_records_appended_mid_walk() {
        let mut list = EventList::new();
        list.append(rec(0));
        list.append(rec(1));

        let mut seen = Vec::new();
        let mut appended = false;
        list.iter_with_remove(|list, id| {
            seen.push(list.get(id).counter());
            if !appended {
                list.append(rec(99));
                appended = true;
            }
            Disposition::Keep
        });

        assert_eq!(seen, vec![0, 1]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn stop_ends_traversal_early() {
        let mut list = EventList::new();
        list.append(rec(0));
        list.append(rec(1));
        list.append(rec(2));

        let mut seen = Vec::new();
        list.iter_with_remove(|list, id| {
            seen.push(list.get(id).counter());
            if seen.len() == 1 {
                Disposition::Stop
            } else {
                Disposition::Keep
            }
        });
        assert_eq!(seen, vec![0]);
    }

    #[test]
    fn removing_current_record_during_walk_does_not_break_traversal() {
        let mut list = EventList::new();
        list.append(rec(0));
        list.append(rec(1));
        list.append(rec(2));

        let mut seen = Vec::new();
        list.iter_with_remove(|list, id| {
            let counter = list.get(id).counter();
            seen.push(counter);
            if counter == 1 {
                list.remove(id);
                Disposition::Unlinked
            } else {
                Disposition::Keep
            }
        });

        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn reused_slots_do_not_corrupt_links() {
        let mut list = EventList::new();
        let a = list.append(rec(0));
        list.remove(a);
        list.append(rec(1));
        list.append(rec(2));
        assert_eq!(list.len(), 2);

        let mut seen = Vec::new();
        list.iter_with_remove(|list, id| {
            seen.push(list.get(id).counter());
            Disposition::Keep
        });
        assert_eq!(seen, vec![1, 2]);
    }
}
