//! Per-rank computation and its reduction onto a root member.
use std::io::Write;
use log::debug;
use crate::{
    Communicator,
    Error,
    GroupContext,
    GroupSize,
    Mode,
    Rank,
    Result,
    Value,
};

/// Square a rank.
pub fn square(rank: Rank) -> Result<Value> {
    rank.checked_mul(rank).ok_or(Error::Overflow)
}

/// Closed form of `square` summed over every rank of a group of `size`.
pub fn sum_of_squares(size: GroupSize) -> Result<Value> {
    let n = u128::from(size);
    let total = n
        .checked_mul(n.saturating_sub(1))
        .and_then(|x| x.checked_mul((2 * n).saturating_sub(1)))
        .ok_or(Error::Overflow)?
        / 6;
    Value::try_from(total).map_err(|_| Error::Overflow)
}

type Kernel = fn(Rank) -> Result<Value>;

/// Computes a value from this member's rank and combines it across the
/// group.
///
/// In [`Mode::Reduce`] every member contributes to a sum that only the root
/// prints. In [`Mode::PerRank`] every member prints its own value and no
/// collective is made.
pub struct RankReducer<C, F = Kernel> {
    group: GroupContext<C>,
    f: F,
    root: Rank,
    mode: Mode,
    verify: bool,
}

impl<C> RankReducer<C> {
    /// Create a reducer that squares the rank.
    pub fn new(group: GroupContext<C>, root: Rank, mode: Mode) -> RankReducer<C> {
        RankReducer::with_fn(group, square as Kernel, root, mode)
    }
}

impl<C, F> RankReducer<C, F>
where
    F: Fn(Rank) -> Result<Value>,
{
    /// Create a reducer with a custom per-rank function.
    pub fn with_fn(group: GroupContext<C>, f: F, root: Rank, mode: Mode) -> RankReducer<C, F> {
        RankReducer {
            group,
            f,
            root,
            mode,
            verify: false,
        }
    }

    /// Check the aggregate on the root against [`sum_of_squares`].
    ///
    /// Only meaningful with the default [`square`] function.
    pub fn verify(mut self, verify: bool) -> RankReducer<C, F> {
        self.verify = verify;
        self
    }

    pub fn group(&self) -> &GroupContext<C> {
        &self.group
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn root(&self) -> Rank {
        self.root
    }

    /// Apply the per-rank function to this member's rank.
    pub fn compute_local(&self) -> Result<Value> {
        (self.f)(self.group.rank())
    }

    /// Write the aggregate if this member is `root`; no-op elsewhere.
    pub fn report<W: Write>(&self, aggregate: Option<Value>, root: Rank, out: &mut W) -> Result<()> {
        if self.group.rank() != root {
            return Ok(());
        }
        let aggregate = aggregate.ok_or(Error::MissingAggregate)?;
        writeln!(out, "{}", aggregate)?;
        Ok(())
    }

    /// Write this member's own value.
    pub fn report_local<W: Write>(&self, local: Value, out: &mut W) -> Result<()> {
        writeln!(out, "{}", local)?;
        Ok(())
    }

    fn check(&self, aggregate: Value) -> Result<()> {
        let expected = sum_of_squares(self.group.size())?;
        if aggregate != expected {
            return Err(Error::VerificationFailed {
                expected,
                actual: aggregate,
            });
        }
        Ok(())
    }
}

impl<C, F> RankReducer<C, F>
where
    C: Communicator,
    F: Fn(Rank) -> Result<Value>,
{
    /// Sum `local` across the group onto `root` (collective, blocking).
    pub fn reduce_sum(&self, local: Value, root: Rank) -> Result<Option<Value>> {
        self.group.comm().reduce_sum(local, root)
    }

    /// Run this member's part of the job, writing results to `out`.
    ///
    /// Returns the aggregate on the root in [`Mode::Reduce`], `None`
    /// otherwise.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<Option<Value>> {
        let local = self.compute_local()?;
        debug!("rank {}: local value {}", self.group.rank(), local);
        match self.mode {
            Mode::PerRank => {
                self.report_local(local, out)?;
                Ok(None)
            }
            Mode::Reduce => {
                let aggregate = self.reduce_sum(local, self.root)?;
                if self.verify {
                    if let Some(aggregate) = aggregate {
                        self.check(aggregate)?;
                    }
                }
                self.report(aggregate, self.root, out)?;
                Ok(aggregate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;
    use pretty_assertions::assert_eq;
    use crate::launch;

    fn run_group(size: GroupSize, root: Rank, mode: Mode) -> Vec<(Option<Value>, String)> {
        launch(size, |comm| {
            let group = GroupContext::from_communicator(comm).unwrap();
            let reducer = RankReducer::new(group, root, mode).verify(true);
            let mut out = vec![];
            let aggregate = reducer.run(&mut out).unwrap();
            (aggregate, String::from_utf8(out).unwrap())
        })
        .unwrap()
    }

    fn standalone(rank: Rank, size: GroupSize) -> RankReducer<()> {
        RankReducer::new(GroupContext::new(rank, size, ()).unwrap(), 0, Mode::Reduce)
    }

    #[test]
    fn local_value_is_rank_squared() {
        for rank in (0..1000).chain([Rank::from(u32::MAX)]) {
            assert_eq!(standalone(rank, rank + 1).compute_local().unwrap(), rank * rank);
        }
    }

    #[test]
    fn square_overflow_is_an_error() {
        assert_eq!(square(Rank::from(u32::MAX) + 1), Err(Error::Overflow));
    }

    #[test]
    fn closed_form() {
        assert_eq!(sum_of_squares(1).unwrap(), 0);
        assert_eq!(sum_of_squares(4).unwrap(), 14);
        for n in 1..200u64 {
            let brute: Value = (0..n).map(|r| r * r).sum();
            assert_eq!(sum_of_squares(n).unwrap(), brute);
        }
    }

    #[test]
    fn reduced_sum_matches_closed_form() {
        for n in 1..=12 {
            let results = run_group(n, 0, Mode::Reduce);
            assert_eq!(results[0].0, Some(sum_of_squares(n).unwrap()));
        }
    }

    #[test]
    fn four_members_print_fourteen_on_root() {
        let results = run_group(4, 0, Mode::Reduce);
        assert_eq!(
            results,
            vec![
                (Some(14), "14\n".to_string()),
                (None, String::new()),
                (None, String::new()),
                (None, String::new()),
            ],
        );
    }

    #[test]
    fn non_zero_root_prints_alone() {
        let results = run_group(4, 2, Mode::Reduce);
        let printed: Vec<_> = results.iter().map(|(_, out)| out.as_str()).collect();
        assert_eq!(printed, vec!["", "", "14\n", ""]);
    }

    #[test]
    fn per_rank_mode_prints_every_value() {
        let results = run_group(3, 0, Mode::PerRank);
        assert!(results.iter().all(|(aggregate, _)| aggregate.is_none()));
        let printed: HashSet<_> = results.into_iter().map(|(_, out)| out).collect();
        let expected: HashSet<_> = ["0\n", "1\n", "4\n"].iter().map(|s| s.to_string()).collect();
        assert_eq!(printed, expected);
    }

    #[test]
    fn report_is_silent_off_root() {
        let reducer = standalone(1, 2);
        let mut out: Vec<u8> = vec![];
        reducer.report(Some(5), 0, &mut out).unwrap();
        reducer.report(None, 0, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn report_on_root_needs_an_aggregate() {
        let reducer = standalone(0, 2);
        let mut out: Vec<u8> = vec![];
        assert_eq!(reducer.report(None, 0, &mut out), Err(Error::MissingAggregate));
        reducer.report(Some(5), 0, &mut out).unwrap();
        assert_eq!(out, b"5\n");
    }

    #[test]
    fn custom_function() {
        let results = launch(3, |comm| {
            let group = GroupContext::from_communicator(comm).unwrap();
            let reducer = RankReducer::with_fn(group, |rank: Rank| Ok(rank + 1), 0, Mode::Reduce);
            reducer.run(&mut io::sink()).unwrap()
        })
        .unwrap();
        assert_eq!(results, vec![Some(6), None, None]);
    }

    #[test]
    fn verification_catches_wrong_aggregate() {
        let results = launch(3, |comm| {
            let group = GroupContext::from_communicator(comm).unwrap();
            RankReducer::with_fn(group, |rank: Rank| Ok(rank + 1), 0, Mode::Reduce)
                .verify(true)
                .run(&mut io::sink())
        })
        .unwrap();
        assert_eq!(
            results,
            vec![Err(Error::VerificationFailed { expected: 5, actual: 6 }), Ok(None), Ok(None)],
        );
    }

    #[test]
    fn invalid_root_fails_the_run() {
        let results = launch(2, |comm| {
            let group = GroupContext::from_communicator(comm).unwrap();
            RankReducer::new(group, 5, Mode::Reduce).run(&mut io::sink())
        })
        .unwrap();
        assert_eq!(results, vec![Err(Error::InvalidRank(5)), Err(Error::InvalidRank(5))]);
    }
}
