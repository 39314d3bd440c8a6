//! Exact solver for the "pick k per block, pack per row" binary programs
//!
//! The solver works on programs with a block structure:
//! - every equality row has unit coefficients and the equality rows partition the
//!   variables ("pick exactly k of these")
//! - every `<=` row has non-negative coefficients (packing rows)
//!
//! The appliance formulation has exactly this shape: one runtime row per appliance
//! and one max-power row per hour.
//!
//! When every variable sits in at most one packing row, the rows are swept as columns
//! (hours) from last to first. A state is the number of picks each block still owes, and
//! the cheapest completion of every state is kept for each column, so interchangeable
//! hours are never explored twice and counting infeasibility falls out of the table
//! without search. Choices inside a column are ordered "take" before "skip", lower block
//! first, so the optimum reported is always the same one and prefers early columns.
//!
//! Programs whose state space exceeds the budget, or whose variables share several
//! packing rows, fall back to a depth-first branch-and-bound that fills blocks one after
//! another. Inside a block candidates are tried cheapest first, ties by variable index,
//! "take" before "skip". A node is cut when some block can no longer be completed with
//! variables that fit the remaining slack on their own, or when its lower bound (fixed
//! cost plus the cheapest fitting completion of every open block) does not beat the
//! incumbent.

use ordered_float::OrderedFloat;

use crate::optimizer::formulation::FEASIBILITY_EPSILON;
use crate::optimizer::{
    ConstraintOp, Deadline, IlpSolver, IntegerProgram, SolveLimits, SolveOutcome,
};

/// Nodes between two deadline checks
const DEFAULT_POLL_INTERVAL: u64 = 1024;

/// Largest number of sweep states (product of `need + 1` over blocks)
const DEFAULT_MAX_STATES: usize = 1 << 20;

/// Columns with more variables than this have too many subsets to enumerate
const MAX_COLUMN_VARIABLES: usize = 15;

const UNREACHED: u16 = u16::MAX;

#[derive(Debug, Clone)]
pub struct BranchAndBoundSolver {
    poll_interval: u64,
    max_states: usize,
}

impl Default for BranchAndBoundSolver {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_states: DEFAULT_MAX_STATES,
        }
    }
}

impl BranchAndBoundSolver {
    pub fn new(poll_interval: u64) -> Self {
        Self {
            poll_interval: poll_interval.max(1),
            ..Self::default()
        }
    }

    /// Caps the column sweep; larger programs use the block search
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }
}

impl IlpSolver for BranchAndBoundSolver {
    fn name(&self) -> &'static str {
        "branch-and-bound"
    }

    fn solve(&self, program: &IntegerProgram, limits: &SolveLimits) -> SolveOutcome {
        let deadline = limits.start();
        if deadline.expired() {
            return SolveOutcome::timeout(0);
        }

        let structure = match Structure::analyze(program) {
            Ok(structure) => structure,
            Err(msg) => return SolveOutcome::error(msg),
        };

        if let Some(row) = structure.slack.iter().position(|s| *s < -FEASIBILITY_EPSILON) {
            let name = &program.constraints[structure.packing_rows[row]].name;
            return SolveOutcome::infeasible(0, format!("{} cannot be met even when idle", name));
        }

        for block in &structure.blocks {
            let hosts = block.candidates.iter().filter(|&&var| structure.fits_idle(var)).count();
            if hosts < block.need {
                let name = &program.constraints[block.row].name;
                return SolveOutcome::infeasible(
                    0,
                    format!("{} needs {} variables but only {} fit", name, block.need, hosts),
                );
            }
        }

        match Sweep::plan(&structure, program, self.max_states) {
            Some(sweep) => sweep.run(program, self.poll_interval, &deadline),
            None => self.search(&structure, program, &deadline),
        }
    }
}

impl BranchAndBoundSolver {
    fn search(&self, structure: &Structure, program: &IntegerProgram, deadline: &Deadline<'_>) -> SolveOutcome {
        tracing::debug!(blocks = structure.blocks.len(), "falling back to block search");
        let mut search = Search {
            structure,
            objective: &program.objective,
            slack: structure.slack.clone(),
            assignment: vec![false; program.num_variables()],
            cost: 0.0,
            best: None,
            nodes: 0,
            poll_interval: self.poll_interval,
            deadline,
            aborted: false,
        };

        match structure.blocks.first() {
            Some(first) => search.branch(0, 0, first.need),
            None => search.best = Some((search.assignment.clone(), 0.0)),
        }

        let nodes = search.nodes;
        if search.aborted {
            return SolveOutcome::timeout(nodes);
        }
        match search.best {
            Some((assignment, cost)) => SolveOutcome::optimal(assignment, cost, nodes),
            None => SolveOutcome::infeasible(nodes, "no assignment satisfies every row"),
        }
    }
}

/// "Pick exactly `need` of `candidates`"
#[derive(Debug)]
struct Block {
    /// Constraint index of the equality row
    row: usize,
    need: usize,
    /// Cheapest first, ties by variable index
    candidates: Vec<usize>,
}

#[derive(Debug)]
struct Structure {
    blocks: Vec<Block>,
    block_of_var: Vec<usize>,
    /// Constraint index of each packing row
    packing_rows: Vec<usize>,
    /// Initial slack (right-hand side) of each packing row
    slack: Vec<f64>,
    /// Packing rows each variable appears in, with its coefficient
    rows_of_var: Vec<Vec<(usize, f64)>>,
}

impl Structure {
    fn analyze(program: &IntegerProgram) -> Result<Self, String> {
        let n = program.num_variables();
        let mut block_of_var: Vec<Option<usize>> = vec![None; n];
        let mut blocks = Vec::new();
        let mut packing_rows = Vec::new();
        let mut slack = Vec::new();
        let mut rows_of_var = vec![Vec::new(); n];

        for (index, row) in program.constraints.iter().enumerate() {
            if let Some((var, _)) = row.terms.iter().find(|(var, _)| *var >= n) {
                return Err(format!("{} references unknown variable {}", row.name, var));
            }

            match row.op {
                ConstraintOp::Eq => {
                    if row.terms.iter().any(|(_, coef)| (coef - 1.0).abs() > FEASIBILITY_EPSILON) {
                        return Err(format!("{} is not a unit-coefficient equality", row.name));
                    }
                    if row.rhs < -FEASIBILITY_EPSILON || row.rhs.fract().abs() > FEASIBILITY_EPSILON {
                        return Err(format!("{} has a non-integral right-hand side", row.name));
                    }
                    for (var, _) in &row.terms {
                        if block_of_var[*var].replace(blocks.len()).is_some() {
                            return Err(format!("variable {} is in more than one equality row", var));
                        }
                    }

                    let mut candidates: Vec<usize> = row.terms.iter().map(|(var, _)| *var).collect();
                    candidates.sort_by_key(|&var| (OrderedFloat(program.objective[var]), var));
                    blocks.push(Block {
                        row: index,
                        need: row.rhs.round() as usize,
                        candidates,
                    });
                }
                ConstraintOp::Le => {
                    if row.terms.iter().any(|(_, coef)| *coef < 0.0) {
                        return Err(format!("{} has a negative coefficient", row.name));
                    }
                    let packing = packing_rows.len();
                    for (var, coef) in &row.terms {
                        rows_of_var[*var].push((packing, *coef));
                    }
                    packing_rows.push(index);
                    slack.push(row.rhs);
                }
                ConstraintOp::Ge => {
                    return Err(format!("{} is a >= row, which is not supported", row.name));
                }
            }
        }

        let block_of_var = block_of_var
            .into_iter()
            .enumerate()
            .map(|(var, block)| block.ok_or_else(|| format!("variable {} is not in any equality row", var)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            blocks,
            block_of_var,
            packing_rows,
            slack,
            rows_of_var,
        })
    }

    /// `var` fits the initial slack of all its rows
    fn fits_idle(&self, var: usize) -> bool {
        self.rows_of_var[var]
            .iter()
            .all(|(row, coef)| self.slack[*row] - coef >= -FEASIBILITY_EPSILON)
    }
}

/// One packing row, or a variable outside every packing row
#[derive(Debug)]
struct Column {
    /// Subsets of the column's variables that fit its slack, preferred first
    choices: Vec<Choice>,
}

#[derive(Debug)]
struct Choice {
    vars: Vec<usize>,
    cost: f64,
    /// Variables taken per block
    picks: Vec<(usize, usize)>,
    /// State index distance covered by `picks`
    offset: usize,
}

/// Column-by-column table of cheapest completions
///
/// A state index encodes the picks still owed by every block in mixed radix,
/// block 0 least significant.
#[derive(Debug)]
struct Sweep {
    columns: Vec<Column>,
    needs: Vec<usize>,
    strides: Vec<usize>,
    states: usize,
    /// `reach[c][b]`: variables of block `b` in columns `c..` that fit when idle
    reach: Vec<Vec<usize>>,
    /// `lead[c][b]`: the same over columns `..c`, bounding how much can already be paid
    lead: Vec<Vec<usize>>,
}

impl Sweep {
    fn plan(structure: &Structure, program: &IntegerProgram, max_states: usize) -> Option<Self> {
        if structure.rows_of_var.iter().any(|rows| rows.len() > 1) {
            return None;
        }

        let needs: Vec<usize> = structure.blocks.iter().map(|block| block.need).collect();
        let mut strides = Vec::with_capacity(needs.len());
        let mut states = 1usize;
        for need in &needs {
            strides.push(states);
            states = states.checked_mul(need + 1)?;
        }
        if states > max_states {
            return None;
        }

        let mut members: Vec<Vec<(usize, f64)>> = vec![Vec::new(); structure.packing_rows.len()];
        let mut slack = structure.slack.clone();
        for (var, rows) in structure.rows_of_var.iter().enumerate() {
            match rows.first() {
                Some(&(row, coef)) => members[row].push((var, coef)),
                None => {
                    members.push(vec![(var, 0.0)]);
                    slack.push(f64::INFINITY);
                }
            }
        }
        if members.iter().any(|column| column.len() > MAX_COLUMN_VARIABLES) {
            return None;
        }

        let block_of_var = &structure.block_of_var;
        let hosted: Vec<Vec<usize>> = members
            .iter()
            .zip(&slack)
            .map(|(column, slack)| {
                let mut counts = vec![0; needs.len()];
                for &(var, coef) in column {
                    if coef <= slack + FEASIBILITY_EPSILON {
                        counts[block_of_var[var]] += 1;
                    }
                }
                counts
            })
            .collect();

        let mut lead = vec![vec![0; needs.len()]; members.len() + 1];
        let mut reach = vec![vec![0; needs.len()]; members.len() + 1];
        for c in 0..members.len() {
            lead[c + 1] = lead[c].iter().zip(&hosted[c]).map(|(a, b)| a + b).collect();
        }
        for c in (0..members.len()).rev() {
            reach[c] = reach[c + 1].iter().zip(&hosted[c]).map(|(a, b)| a + b).collect();
        }

        let mut columns = Vec::with_capacity(members.len());
        for (c, column) in members.iter_mut().enumerate() {
            column.sort_by_key(|&(var, _)| (block_of_var[var], var));

            let mut subsets = Vec::new();
            collect_subsets(column, 0, 0.0, slack[c], &needs, block_of_var, &mut Vec::new(), &mut subsets);
            let choices = subsets
                .into_iter()
                .map(|vars| {
                    let mut picks: Vec<(usize, usize)> = Vec::new();
                    for &var in &vars {
                        let block = block_of_var[var];
                        if let Some((last, count)) = picks.last_mut() {
                            if *last == block {
                                *count += 1;
                                continue;
                            }
                        }
                        picks.push((block, 1));
                    }
                    Choice {
                        cost: vars.iter().map(|&var| program.objective[var]).sum(),
                        offset: picks.iter().map(|&(block, count)| strides[block] * count).sum(),
                        vars,
                        picks,
                    }
                })
                .collect();
            columns.push(Column { choices });
        }

        Some(Self {
            columns,
            needs,
            strides,
            states,
            reach,
            lead,
        })
    }

    fn run(&self, program: &IntegerProgram, poll_interval: u64, deadline: &Deadline<'_>) -> SolveOutcome {
        let mut nodes: u64 = 0;
        let mut to_go = vec![f64::INFINITY; self.states];
        to_go[0] = 0.0;
        // One entry per column, last column first
        let mut picked: Vec<Vec<u16>> = Vec::with_capacity(self.columns.len());
        let mut owed = vec![0usize; self.needs.len()];

        for (c, column) in self.columns.iter().enumerate().rev() {
            let mut value = vec![f64::INFINITY; self.states];
            let mut choice = vec![UNREACHED; self.states];
            owed.iter_mut().for_each(|o| *o = 0);

            for state in 0..self.states {
                if state > 0 {
                    self.advance(&mut owed);
                }
                nodes += 1;
                if nodes % poll_interval == 0 && deadline.expired() {
                    return SolveOutcome::timeout(nodes);
                }
                if !self.reachable(c, &owed) {
                    continue;
                }

                for (index, option) in column.choices.iter().enumerate() {
                    if option.picks.iter().any(|&(block, count)| owed[block] < count) {
                        continue;
                    }
                    let rest = to_go[state - option.offset];
                    if rest.is_finite() {
                        let total = option.cost + rest;
                        if total < value[state] - FEASIBILITY_EPSILON {
                            value[state] = total;
                            choice[state] = index as u16;
                        }
                    }
                }
            }

            picked.push(choice);
            to_go = value;
        }

        let full: usize = self.needs.iter().zip(&self.strides).map(|(need, stride)| need * stride).sum();
        if !to_go[full].is_finite() {
            return SolveOutcome::infeasible(nodes, "no assignment satisfies every row");
        }

        let mut assignment = vec![false; program.num_variables()];
        let mut state = full;
        for (column, choice) in self.columns.iter().zip(picked.iter().rev()) {
            let Some(option) = column.choices.get(usize::from(choice[state])) else {
                return SolveOutcome::error(format!("sweep has no choice recorded for state {}", state));
            };
            for &var in &option.vars {
                assignment[var] = true;
            }
            state -= option.offset;
        }

        let objective = program.objective_value(&assignment);
        SolveOutcome::optimal(assignment, objective, nodes)
    }

    /// Whether column `c` can be entered owing `owed`
    fn reachable(&self, c: usize, owed: &[usize]) -> bool {
        owed.iter()
            .zip(&self.needs)
            .enumerate()
            .all(|(block, (owed, need))| *owed <= self.reach[c][block] && need - owed <= self.lead[c][block])
    }

    /// Next state in index order
    fn advance(&self, owed: &mut [usize]) {
        for (owed, need) in owed.iter_mut().zip(&self.needs) {
            if *owed < *need {
                *owed += 1;
                return;
            }
            *owed = 0;
        }
    }
}

/// Fitting subsets of `column[at..]`, with each variable taken before it is skipped
#[allow(clippy::too_many_arguments)]
fn collect_subsets(
    column: &[(usize, f64)],
    at: usize,
    load: f64,
    slack: f64,
    needs: &[usize],
    block_of_var: &[usize],
    taken: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    let Some(&(var, coef)) = column.get(at) else {
        out.push(taken.clone());
        return;
    };

    let block = block_of_var[var];
    let already = taken.iter().filter(|&&other| block_of_var[other] == block).count();
    if already < needs[block] && load + coef <= slack + FEASIBILITY_EPSILON {
        taken.push(var);
        collect_subsets(column, at + 1, load + coef, slack, needs, block_of_var, taken, out);
        taken.pop();
    }
    collect_subsets(column, at + 1, load, slack, needs, block_of_var, taken, out);
}

struct Search<'a> {
    structure: &'a Structure,
    objective: &'a [f64],
    slack: Vec<f64>,
    assignment: Vec<bool>,
    cost: f64,
    best: Option<(Vec<bool>, f64)>,
    nodes: u64,
    poll_interval: u64,
    deadline: &'a Deadline<'a>,
    aborted: bool,
}

impl Search<'_> {
    /// Explore block `block` from candidate `pos` with `remaining` picks left
    fn branch(&mut self, block: usize, pos: usize, remaining: usize) {
        if self.aborted {
            return;
        }
        self.nodes += 1;
        if self.nodes % self.poll_interval == 0 && self.deadline.expired() {
            self.aborted = true;
            return;
        }

        let structure = self.structure;

        if remaining == 0 {
            match structure.blocks.get(block + 1) {
                Some(next) => self.branch(block + 1, 0, next.need),
                None => {
                    if self.improves(self.cost) {
                        self.best = Some((self.assignment.clone(), self.cost));
                    }
                }
            }
            return;
        }

        let Some(bound) = self.lower_bound(block, pos, remaining) else {
            return;
        };
        if !self.improves(bound) {
            return;
        }

        let candidates = &structure.blocks[block].candidates;
        let var = candidates[pos];

        if self.fits(var) {
            self.set(var, true);
            self.branch(block, pos + 1, remaining - 1);
            self.set(var, false);
        }

        if candidates.len() - pos - 1 >= remaining {
            self.branch(block, pos + 1, remaining);
        }
    }

    fn improves(&self, value: f64) -> bool {
        match &self.best {
            Some((_, best)) => value < best - FEASIBILITY_EPSILON,
            None => true,
        }
    }

    fn fits(&self, var: usize) -> bool {
        self.structure.rows_of_var[var]
            .iter()
            .all(|(row, coef)| self.slack[*row] - coef >= -FEASIBILITY_EPSILON)
    }

    fn set(&mut self, var: usize, on: bool) {
        let sign = if on { 1.0 } else { -1.0 };
        self.assignment[var] = on;
        self.cost += sign * self.objective[var];
        for (row, coef) in &self.structure.rows_of_var[var] {
            self.slack[*row] -= sign * coef;
        }
    }

    /// Cheapest `count` candidates from `from` on that fit the current slack
    fn cheapest_completion(&self, block: usize, from: usize, count: usize) -> Option<f64> {
        if count == 0 {
            return Some(0.0);
        }
        let mut taken = 0;
        let mut sum = 0.0;
        for &var in &self.structure.blocks[block].candidates[from..] {
            if self.fits(var) {
                sum += self.objective[var];
                taken += 1;
                if taken == count {
                    return Some(sum);
                }
            }
        }
        None
    }

    fn lower_bound(&self, block: usize, pos: usize, remaining: usize) -> Option<f64> {
        let mut bound = self.cost + self.cheapest_completion(block, pos, remaining)?;
        for (later, next) in self.structure.blocks.iter().enumerate().skip(block + 1) {
            bound += self.cheapest_completion(later, 0, next.need)?;
        }
        Some(bound)
    }
}
