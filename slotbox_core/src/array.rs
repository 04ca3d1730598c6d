use crate::config::Limits;
use crate::reader::{self, ReaderError};
use crate::session::{CommandError, LineInterpreter, expect_arity};
use crate::stats::Aggregate;
use crate::table::{self, HandleTable, TableError};

/// Integer-array store: numbered slots of `i64` elements with explicit
/// create/free lifecycles and range-checked access.
#[derive(Debug)]
pub struct ArrayStore {
    table: HandleTable<Vec<i64>>,
    max_slot_len: usize,
}

impl ArrayStore {
    pub fn new(limits: &Limits) -> Self {
        Self {
            table: HandleTable::new(limits.max_slots),
            max_slot_len: limits.max_slot_len,
        }
    }

    /// Creates a zero-initialized slot of exactly `size` elements at `index`,
    /// replacing any slot already there.
    pub fn create(&mut self, index: i64, size: i64) -> Result<(), CommandError> {
        let index = table::to_index(index, self.table.max_slots())?;
        let size = reader::checked_len(size, self.max_slot_len)?;
        self.table.create(index, vec![0; size])?;
        Ok(())
    }

    pub fn fill(&mut self, index: i64, value: i64) -> Result<(), CommandError> {
        let index = table::to_index(index, self.table.max_slots())?;
        let slot = self.table.get_mut(index)?;
        slot.fill(value);
        Ok(())
    }

    /// Appends `src[offset .. offset + count]` to `dest`. Both the source
    /// range and the grown destination size are validated before any copy.
    pub fn splice(
        &mut self,
        dest: i64,
        src: i64,
        offset: i64,
        count: i64,
    ) -> Result<(), CommandError> {
        let dest = table::to_index(dest, self.table.max_slots())?;
        let src = table::to_index(src, self.table.max_slots())?;

        let segment = {
            let src_slot = self.table.get(src)?;
            let end = offset
                .checked_add(count)
                .ok_or(CommandError::Overflow)?;
            let (start, end) = table::checked_range(offset, end, src_slot.len())?;
            src_slot[start..end].to_vec()
        };

        let dest_len = self.table.get(dest)?.len();
        let grown = dest_len
            .checked_add(segment.len())
            .ok_or(CommandError::Overflow)?;
        if grown > self.max_slot_len {
            return Err(CommandError::Reader(ReaderError::LengthOverflow {
                requested: grown as i64,
                max: self.max_slot_len,
            }));
        }

        self.table.get_mut(dest)?.extend_from_slice(&segment);
        Ok(())
    }

    /// Concatenates slots `a` and `b` into a new slot at `index`.
    pub fn join(&mut self, index: i64, a: i64, b: i64) -> Result<(), CommandError> {
        let index = table::to_index(index, self.table.max_slots())?;
        let a = table::to_index(a, self.table.max_slots())?;
        let b = table::to_index(b, self.table.max_slots())?;

        let joined_len = self
            .table
            .get(a)?
            .len()
            .checked_add(self.table.get(b)?.len())
            .ok_or(CommandError::Overflow)?;
        if joined_len > self.max_slot_len {
            return Err(CommandError::Reader(ReaderError::LengthOverflow {
                requested: joined_len as i64,
                max: self.max_slot_len,
            }));
        }

        let mut joined = Vec::with_capacity(joined_len);
        joined.extend_from_slice(self.table.get(a)?);
        joined.extend_from_slice(self.table.get(b)?);
        self.table.create(index, joined)?;
        Ok(())
    }

    pub fn free(&mut self, index: i64) -> Result<(), CommandError> {
        let index = table::to_index(index, self.table.max_slots())?;
        self.table.free(index)?;
        Ok(())
    }

    /// Mean of the slot's elements.
    pub fn stat(&self, index: i64) -> Result<i64, CommandError> {
        let index = table::to_index(index, self.table.max_slots())?;
        let slot = self.table.get(index)?;
        let mut agg = Aggregate::new();
        for &value in slot {
            agg.push(value);
        }
        Ok(agg.mean()?)
    }

    /// Elements `start..=end` of the slot, space separated.
    pub fn print(&self, index: i64, start: i64, end: i64) -> Result<String, CommandError> {
        let index = table::to_index(index, self.table.max_slots())?;
        let slot = self.table.get(index)?;
        // The command's range is inclusive on both ends.
        let end_excl = end.checked_add(1).ok_or(CommandError::Overflow)?;
        let (start, end_excl) = table::checked_range(start, end_excl, slot.len())?;

        let rendered: Vec<String> = slot[start..end_excl].iter().map(|v| v.to_string()).collect();
        Ok(rendered.join(" "))
    }

    pub fn get(&self, index: usize) -> Result<&Vec<i64>, TableError> {
        self.table.get(index)
    }
}

/// Line frontend over `ArrayStore`.
///
/// Accepts both command vocabularies the format historically shipped with:
/// the short names (`CREATE`, `FILL`, …) and the `_ARRAY`-suffixed ones
/// (`CREATE_ARRAY`, `FILL_ARRAY`, …).
#[derive(Debug)]
pub struct ArrayInterpreter {
    store: ArrayStore,
}

impl ArrayInterpreter {
    pub fn new(limits: &Limits) -> Self {
        Self {
            store: ArrayStore::new(limits),
        }
    }
}

impl LineInterpreter for ArrayInterpreter {
    fn eval_line(&mut self, line: &str) -> Result<Option<String>, CommandError> {
        let tokens = reader::tokenize(line);
        let Some(&command) = tokens.first() else {
            return Ok(None);
        };

        let int_arg = |i: usize| reader::parse_i64(tokens[i]);

        match command {
            "CREATE" | "CREATE_ARRAY" => {
                expect_arity(command, &tokens, 2)?;
                self.store.create(int_arg(1)?, int_arg(2)?)?;
                Ok(None)
            }
            "FILL" | "FILL_ARRAY" => {
                expect_arity(command, &tokens, 2)?;
                self.store.fill(int_arg(1)?, int_arg(2)?)?;
                Ok(None)
            }
            "SPLICE" | "SPLICE_ARRAY" => {
                expect_arity(command, &tokens, 4)?;
                self.store
                    .splice(int_arg(1)?, int_arg(2)?, int_arg(3)?, int_arg(4)?)?;
                Ok(None)
            }
            "JOIN" | "JOIN_ARRAYS" => {
                expect_arity(command, &tokens, 3)?;
                self.store.join(int_arg(1)?, int_arg(2)?, int_arg(3)?)?;
                Ok(None)
            }
            "FREE" | "FREE_ARRAY" => {
                expect_arity(command, &tokens, 1)?;
                self.store.free(int_arg(1)?)?;
                Ok(None)
            }
            "STAT" | "COMPUTE_STAT" => {
                expect_arity(command, &tokens, 1)?;
                let mean = self.store.stat(int_arg(1)?)?;
                Ok(Some(format!("Average: {mean}")))
            }
            "PRINT" | "PRINT_ARRAY" => {
                expect_arity(command, &tokens, 3)?;
                let rendered = self.store.print(int_arg(1)?, int_arg(2)?, int_arg(3)?)?;
                Ok(Some(rendered))
            }
            _ => Err(CommandError::UnknownCommand(command.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReaderError;
    use crate::stats::StatsError;

    fn small_limits() -> Limits {
        Limits {
            max_slots: 8,
            max_slot_len: 16,
            ..Limits::default()
        }
    }

    fn eval(interp: &mut ArrayInterpreter, line: &str) -> Result<Option<String>, CommandError> {
        interp.eval_line(line)
    }

    #[test]
    fn create_fill_print_round_trip() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE 0 10").unwrap();
        eval(&mut interp, "FILL 0 5").unwrap();
        assert_eq!(
            eval(&mut interp, "PRINT 0 0 9").unwrap(),
            Some("5 5 5 5 5 5 5 5 5 5".to_string())
        );
        assert_eq!(
            eval(&mut interp, "STAT 0").unwrap(),
            Some("Average: 5".to_string())
        );
    }

    #[test]
    fn fresh_slot_is_zero_initialized_with_exact_size() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE 2 4").unwrap();
        let slot = interp.store.get(2).unwrap();
        assert_eq!(slot, &vec![0, 0, 0, 0]);
    }

    #[test]
    fn print_past_slot_end_is_invalid_range() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE 0 10").unwrap();
        match eval(&mut interp, "PRINT 0 0 20") {
            Err(CommandError::Table(TableError::InvalidRange { size, .. })) => {
                assert_eq!(size, 10);
            }
            other => panic!("expected InvalidRange, got {other:?}"),
        }
    }

    #[test]
    fn create_with_negative_or_huge_size_fails_closed() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        assert!(matches!(
            eval(&mut interp, "CREATE 0 -5"),
            Err(CommandError::Reader(ReaderError::LengthOverflow { .. }))
        ));
        assert!(matches!(
            eval(&mut interp, "CREATE 0 999999"),
            Err(CommandError::Reader(ReaderError::LengthOverflow { .. }))
        ));
        assert!(
            interp.store.get(0).is_err(),
            "no slot may exist after a rejected create"
        );
    }

    #[test]
    fn double_free_is_reported() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE 1 4").unwrap();
        eval(&mut interp, "FREE 1").unwrap();
        assert!(matches!(
            eval(&mut interp, "FREE 1"),
            Err(CommandError::Table(TableError::NotAllocated { index: 1 }))
        ));
    }

    #[test]
    fn splice_appends_validated_segment() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE 0 3").unwrap();
        eval(&mut interp, "CREATE 1 4").unwrap();
        eval(&mut interp, "FILL 1 7").unwrap();
        eval(&mut interp, "SPLICE 0 1 1 2").unwrap();
        assert_eq!(interp.store.get(0).unwrap(), &vec![0, 0, 0, 7, 7]);
    }

    #[test]
    fn splice_range_outside_source_is_invalid() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE 0 3").unwrap();
        eval(&mut interp, "CREATE 1 4").unwrap();
        assert!(matches!(
            eval(&mut interp, "SPLICE 0 1 2 5"),
            Err(CommandError::Table(TableError::InvalidRange { .. }))
        ));
        assert_eq!(
            interp.store.get(0).unwrap().len(),
            3,
            "failed splice must not grow the destination"
        );
    }

    #[test]
    fn splice_growing_past_slot_cap_fails_closed() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE 0 10").unwrap();
        eval(&mut interp, "CREATE 1 10").unwrap();
        assert!(matches!(
            eval(&mut interp, "SPLICE 0 1 0 10"),
            Err(CommandError::Reader(ReaderError::LengthOverflow { .. }))
        ));
    }

    #[test]
    fn self_splice_is_permitted() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE 0 2").unwrap();
        eval(&mut interp, "FILL 0 3").unwrap();
        eval(&mut interp, "SPLICE 0 0 0 2").unwrap();
        assert_eq!(interp.store.get(0).unwrap(), &vec![3, 3, 3, 3]);
    }

    #[test]
    fn join_concatenates_into_new_slot() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE 0 2").unwrap();
        eval(&mut interp, "FILL 0 1").unwrap();
        eval(&mut interp, "CREATE 1 3").unwrap();
        eval(&mut interp, "FILL 1 2").unwrap();
        eval(&mut interp, "JOIN 2 0 1").unwrap();
        assert_eq!(interp.store.get(2).unwrap(), &vec![1, 1, 2, 2, 2]);
    }

    #[test]
    fn stat_of_empty_slot_is_empty_aggregate() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE 0 0").unwrap();
        assert!(matches!(
            eval(&mut interp, "STAT 0"),
            Err(CommandError::Stats(StatsError::EmptyAggregate))
        ));
    }

    #[test]
    fn operations_on_unallocated_slots_are_reported() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        assert!(matches!(
            eval(&mut interp, "FILL 3 1"),
            Err(CommandError::Table(TableError::NotAllocated { index: 3 }))
        ));
        assert!(matches!(
            eval(&mut interp, "STAT 3"),
            Err(CommandError::Table(TableError::NotAllocated { index: 3 }))
        ));
    }

    #[test]
    fn index_past_slot_cap_is_out_of_range() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        assert!(matches!(
            eval(&mut interp, "CREATE 8 4"),
            Err(CommandError::Table(TableError::IndexOutOfRange { .. }))
        ));
        assert!(matches!(
            eval(&mut interp, "CREATE -1 4"),
            Err(CommandError::Table(TableError::IndexOutOfRange { .. }))
        ));
    }

    #[test]
    fn long_vocabulary_aliases_work() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        eval(&mut interp, "CREATE_ARRAY 0 4").unwrap();
        eval(&mut interp, "FILL_ARRAY 0 9").unwrap();
        assert_eq!(
            eval(&mut interp, "COMPUTE_STAT 0").unwrap(),
            Some("Average: 9".to_string())
        );
        eval(&mut interp, "FREE_ARRAY 0").unwrap();
    }

    #[test]
    fn unknown_command_and_bad_arity_are_reported_not_ignored() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        assert!(matches!(
            eval(&mut interp, "FROBNICATE 1"),
            Err(CommandError::UnknownCommand(_))
        ));
        assert!(matches!(
            eval(&mut interp, "CREATE 0"),
            Err(CommandError::BadArity { .. })
        ));
    }

    #[test]
    fn non_numeric_argument_is_not_a_number() {
        let mut interp = ArrayInterpreter::new(&small_limits());
        assert!(matches!(
            eval(&mut interp, "CREATE zero 10"),
            Err(CommandError::Reader(ReaderError::NotANumber(_)))
        ));
    }
}
