use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Upper bound on operators in a working-memory expression
pub const MAX_WORKING_MEMORY_OPS: u8 = 8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProblemError {
    #[error("at least one operation must be active")]
    NoOperations,
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("unknown difficulty '{0}'")]
    UnknownDifficulty(String),
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Square,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Addition,
        Operation::Subtraction,
        Operation::Multiplication,
        Operation::Division,
        Operation::Square,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operation::Addition => "+",
            Operation::Subtraction => "−",
            Operation::Multiplication => "×",
            Operation::Division => "÷",
            Operation::Square => "²",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Operation::Addition => "Addition",
            Operation::Subtraction => "Subtraction",
            Operation::Multiplication => "Multiplication",
            Operation::Division => "Division",
            Operation::Square => "Square",
        }
    }
}

impl FromStr for Operation {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.to_string() == s)
            .ok_or_else(|| ProblemError::UnknownOperation(s.to_string()))
    }
}

/// Statistics bucket a problem is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Single(Operation),
    /// nested expressions from working-memory mode
    Mixed,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Single(op) => write!(f, "{op}"),
            Category::Mixed => f.write_str("mixed"),
        }
    }
}

impl FromStr for Category {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "mixed" {
            Ok(Category::Mixed)
        } else {
            s.parse().map(Category::Single)
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DifficultyId {
    Sparks,
    #[default]
    Balanced,
    Insane,
}

impl DifficultyId {
    pub fn band(self) -> &'static Difficulty {
        match self {
            DifficultyId::Sparks => &DIFFICULTIES[0],
            DifficultyId::Balanced => &DIFFICULTIES[1],
            DifficultyId::Insane => &DIFFICULTIES[2],
        }
    }

    /// Cycle through the catalog in display order
    pub fn next(self) -> Self {
        match self {
            DifficultyId::Sparks => DifficultyId::Balanced,
            DifficultyId::Balanced => DifficultyId::Insane,
            DifficultyId::Insane => DifficultyId::Sparks,
        }
    }
}

impl FromStr for DifficultyId {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DIFFICULTIES
            .iter()
            .map(|d| d.id)
            .find(|id| id.to_string() == s)
            .ok_or_else(|| ProblemError::UnknownDifficulty(s.to_string()))
    }
}

/// A named operand range. Operands are drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Difficulty {
    pub id: DifficultyId,
    pub label: &'static str,
    pub min: i64,
    pub max: i64,
    pub description: &'static str,
}

pub const DIFFICULTIES: [Difficulty; 3] = [
    Difficulty {
        id: DifficultyId::Sparks,
        label: "Sparks",
        min: 0,
        max: 9,
        description: "Single digits. Pure speed.",
    },
    Difficulty {
        id: DifficultyId::Balanced,
        label: "Balanced",
        min: 3,
        max: 24,
        description: "Like classic Zetamac rounds.",
    },
    Difficulty {
        id: DifficultyId::Insane,
        label: "Insane",
        min: 10,
        max: 99,
        description: "Two-digit chaos, zero mercy.",
    },
];

/// Non-empty set of operations, kept in canonical order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSet(Vec<Operation>);

impl OperationSet {
    pub fn new<I: IntoIterator<Item = Operation>>(ops: I) -> Result<Self, ProblemError> {
        let mut ops: Vec<Operation> = ops.into_iter().collect();
        ops.sort();
        ops.dedup();
        if ops.is_empty() {
            return Err(ProblemError::NoOperations);
        }
        Ok(Self(ops))
    }

    pub fn all() -> Self {
        Self(Operation::ALL.to_vec())
    }

    pub fn contains(&self, op: Operation) -> bool {
        self.0.contains(&op)
    }

    /// Add or remove `op`. Removing the last active operation is refused and returns false.
    pub fn toggle(&mut self, op: Operation) -> bool {
        if let Some(pos) = self.0.iter().position(|o| *o == op) {
            if self.0.len() == 1 {
                return false;
            }
            self.0.remove(pos);
        } else {
            self.0.push(op);
            self.0.sort();
        }
        true
    }

    pub fn as_slice(&self) -> &[Operation] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Uniform pick from the active operations
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Operation {
        self.0[rng.gen_range(0..self.0.len())]
    }
}

impl Default for OperationSet {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub prompt: String,
    pub answer: i64,
    pub category: Category,
}

fn operand<R: Rng + ?Sized>(rng: &mut R, difficulty: &Difficulty) -> i64 {
    rng.gen_range(difficulty.min..=difficulty.max)
}

pub fn generate_problem<R: Rng + ?Sized>(
    rng: &mut R,
    operations: &OperationSet,
    difficulty: &Difficulty,
) -> Problem {
    let operation = operations.choose(rng);
    let a = operand(rng, difficulty);
    let b = operand(rng, difficulty);

    let (prompt, answer) = match operation {
        Operation::Addition => (format!("{a} + {b}"), a + b),
        Operation::Subtraction => {
            let (minuend, subtrahend) = (a.max(b), a.min(b));
            (format!("{minuend} − {subtrahend}"), minuend - subtrahend)
        }
        Operation::Multiplication => (format!("{a} × {b}"), a * b),
        Operation::Division => {
            let divisor = b.max(1);
            let quotient = a.max(1);
            let dividend = divisor * quotient;
            (format!("{dividend} ÷ {divisor}"), quotient)
        }
        Operation::Square => (format!("{a}²"), a * a),
    };

    Problem {
        prompt,
        answer,
        category: Category::Single(operation),
    }
}

/// Division rarely divides evenly on nested values, so it is left out
const NESTED_OPERATIONS: [Operation; 3] = [
    Operation::Addition,
    Operation::Subtraction,
    Operation::Multiplication,
];

struct Expression {
    value: i64,
    text: String,
}

fn build_expression<R: Rng + ?Sized>(rng: &mut R, op_count: u8, difficulty: &Difficulty) -> Expression {
    if op_count == 0 {
        let value = operand(rng, difficulty);
        return Expression {
            value,
            text: value.to_string(),
        };
    }

    let operation = NESTED_OPERATIONS[rng.gen_range(0..NESTED_OPERATIONS.len())];

    let left_ops = rng.gen_range(0..op_count);
    let right_ops = op_count - 1 - left_ops;
    let left = build_expression(rng, left_ops, difficulty);
    let right = build_expression(rng, right_ops, difficulty);

    match operation {
        Operation::Subtraction => {
            let (left, right) = if left.value < right.value {
                (right, left)
            } else {
                (left, right)
            };
            Expression {
                value: left.value - right.value,
                text: format!("({} − {})", left.text, right.text),
            }
        }
        Operation::Multiplication => Expression {
            value: left.value * right.value,
            text: format!("({} × {})", left.text, right.text),
        },
        _ => Expression {
            value: left.value + right.value,
            text: format!("({} + {})", left.text, right.text),
        },
    }
}

/// Nested expression with exactly `op_count` operators (clamped to [`MAX_WORKING_MEMORY_OPS`]).
pub fn generate_working_memory_problem<R: Rng + ?Sized>(
    rng: &mut R,
    op_count: u8,
    difficulty: &Difficulty,
) -> Problem {
    let expression = build_expression(rng, op_count.min(MAX_WORKING_MEMORY_OPS), difficulty);

    let prompt = match expression
        .text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
    {
        Some(inner) => inner.to_string(),
        None => expression.text,
    };

    Problem {
        prompt,
        answer: expression.value,
        category: Category::Mixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn only(op: Operation) -> OperationSet {
        OperationSet::new([op]).unwrap()
    }

    /// Evaluates a prompt produced by the working-memory generator.
    /// Returns (value, operator count, operand count).
    fn evaluate(prompt: &str) -> (i64, usize, usize) {
        struct Parser<'a> {
            chars: std::iter::Peekable<std::str::Chars<'a>>,
            ops: usize,
            operands: usize,
        }

        impl Parser<'_> {
            fn skip_ws(&mut self) {
                while self.chars.peek() == Some(&' ') {
                    self.chars.next();
                }
            }

            fn operand(&mut self) -> i64 {
                self.skip_ws();
                if self.chars.peek() == Some(&'(') {
                    self.chars.next();
                    let value = self.binary();
                    self.skip_ws();
                    assert_eq!(self.chars.next(), Some(')'));
                    value
                } else {
                    let mut digits = String::new();
                    while let Some(c) = self.chars.peek().copied().filter(char::is_ascii_digit) {
                        digits.push(c);
                        self.chars.next();
                    }
                    self.operands += 1;
                    digits.parse().unwrap()
                }
            }

            fn binary(&mut self) -> i64 {
                let left = self.operand();
                self.skip_ws();
                let op = match self.chars.peek().copied() {
                    Some(c @ ('+' | '−' | '×')) => {
                        self.chars.next();
                        c
                    }
                    _ => return left,
                };
                self.ops += 1;
                let right = self.operand();
                match op {
                    '+' => left + right,
                    '−' => left - right,
                    _ => left * right,
                }
            }
        }

        let mut parser = Parser {
            chars: prompt.chars().peekable(),
            ops: 0,
            operands: 0,
        };
        let value = parser.binary();
        assert!(parser.chars.next().is_none(), "trailing input in {prompt}");
        (value, parser.ops, parser.operands)
    }

    #[test]
    fn test_operation_display_and_parse() {
        for op in Operation::ALL {
            assert_eq!(op.to_string().parse::<Operation>(), Ok(op));
        }
        assert_eq!(Operation::Multiplication.to_string(), "multiplication");
        assert!("modulo".parse::<Operation>().is_err());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("mixed".parse::<Category>(), Ok(Category::Mixed));
        assert_eq!(
            "square".parse::<Category>(),
            Ok(Category::Single(Operation::Square))
        );
        assert_eq!(Category::Mixed.to_string(), "mixed");
    }

    #[test]
    fn test_difficulty_catalog() {
        assert_eq!(DifficultyId::Sparks.band().min, 0);
        assert_eq!(DifficultyId::Sparks.band().max, 9);
        assert_eq!(DifficultyId::Balanced.band().min, 3);
        assert_eq!(DifficultyId::Balanced.band().max, 24);
        assert_eq!(DifficultyId::Insane.band().min, 10);
        assert_eq!(DifficultyId::Insane.band().max, 99);
        assert_eq!(DifficultyId::default(), DifficultyId::Balanced);
        assert_eq!(DifficultyId::Insane.next(), DifficultyId::Sparks);
        assert_eq!("insane".parse::<DifficultyId>(), Ok(DifficultyId::Insane));
    }

    #[test]
    fn test_operation_set_rejects_empty() {
        assert_eq!(
            OperationSet::new(Vec::new()),
            Err(ProblemError::NoOperations)
        );
    }

    #[test]
    fn test_operation_set_dedups_and_orders() {
        let set = OperationSet::new([
            Operation::Square,
            Operation::Addition,
            Operation::Square,
        ])
        .unwrap();
        assert_eq!(set.as_slice(), &[Operation::Addition, Operation::Square]);
    }

    #[test]
    fn test_operation_set_refuses_to_remove_last() {
        let mut set = only(Operation::Division);
        assert!(!set.toggle(Operation::Division));
        assert_eq!(set.len(), 1);

        assert!(set.toggle(Operation::Addition));
        assert!(set.toggle(Operation::Division));
        assert_eq!(set.as_slice(), &[Operation::Addition]);
    }

    #[test]
    fn test_operation_set_choose_stays_in_set() {
        let single = only(Operation::Square);
        assert!(!single.is_empty());
        let mut r = rng(17);
        for _ in 0..50 {
            assert_eq!(single.choose(&mut r), Operation::Square);
        }

        let pair = OperationSet::new([Operation::Addition, Operation::Division]).unwrap();
        let picks: std::collections::HashSet<Operation> =
            (0..200).map(|_| pair.choose(&mut r)).collect();
        assert_eq!(picks.len(), 2);
        assert!(picks.iter().all(|op| pair.contains(*op)));
    }

    #[test]
    fn test_subtraction_never_negative() {
        for band in &DIFFICULTIES {
            let mut r = rng(7);
            for _ in 0..500 {
                let p = generate_problem(&mut r, &only(Operation::Subtraction), band);
                assert!(p.answer >= 0, "{} -> {}", p.prompt, p.answer);
                assert!(p.prompt.contains('−'));
            }
        }
    }

    #[test]
    fn test_division_is_exact() {
        for band in &DIFFICULTIES {
            let mut r = rng(11);
            for _ in 0..500 {
                let p = generate_problem(&mut r, &only(Operation::Division), band);
                let (dividend, divisor) = p.prompt.split_once(" ÷ ").unwrap();
                let dividend: i64 = dividend.parse().unwrap();
                let divisor: i64 = divisor.parse().unwrap();
                assert!(divisor >= 1);
                assert!(p.answer >= 1);
                assert_eq!(dividend, divisor * p.answer);
            }
        }
    }

    #[test]
    fn test_addition_and_multiplication_answers() {
        let mut r = rng(3);
        for _ in 0..200 {
            let p = generate_problem(&mut r, &only(Operation::Addition), DifficultyId::Balanced.band());
            let (a, b) = p.prompt.split_once(" + ").unwrap();
            assert_eq!(a.parse::<i64>().unwrap() + b.parse::<i64>().unwrap(), p.answer);

            let p = generate_problem(
                &mut r,
                &only(Operation::Multiplication),
                DifficultyId::Balanced.band(),
            );
            let (a, b) = p.prompt.split_once(" × ").unwrap();
            assert_eq!(a.parse::<i64>().unwrap() * b.parse::<i64>().unwrap(), p.answer);
        }
    }

    #[test]
    fn test_square_uses_one_operand() {
        let mut r = rng(5);
        for _ in 0..200 {
            let p = generate_problem(&mut r, &only(Operation::Square), DifficultyId::Insane.band());
            let base: i64 = p.prompt.trim_end_matches('²').parse().unwrap();
            assert!((10..=99).contains(&base));
            assert_eq!(p.answer, base * base);
            assert_eq!(p.category, Category::Single(Operation::Square));
        }
    }

    #[test]
    fn test_operation_drawn_from_active_set() {
        let set = OperationSet::new([Operation::Addition, Operation::Square]).unwrap();
        let mut r = rng(9);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..300 {
            let p = generate_problem(&mut r, &set, DifficultyId::Sparks.band());
            seen.insert(p.category);
        }
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&Category::Single(Operation::Addition)));
        assert!(seen.contains(&Category::Single(Operation::Square)));
    }

    #[test]
    fn test_operands_within_band() {
        let mut r = rng(13);
        for _ in 0..300 {
            let p = generate_problem(&mut r, &only(Operation::Addition), DifficultyId::Sparks.band());
            let (a, b) = p.prompt.split_once(" + ").unwrap();
            assert!((0..=9).contains(&a.parse::<i64>().unwrap()));
            assert!((0..=9).contains(&b.parse::<i64>().unwrap()));
        }
    }

    #[test]
    fn test_working_memory_zero_ops_is_single_operand() {
        let mut r = rng(1);
        let p = generate_working_memory_problem(&mut r, 0, DifficultyId::Balanced.band());
        let value: i64 = p.prompt.parse().unwrap();
        assert_eq!(value, p.answer);
        assert_eq!(p.category, Category::Mixed);
    }

    #[test]
    fn test_working_memory_structure_and_value() {
        for n in 1..=MAX_WORKING_MEMORY_OPS {
            for band in &DIFFICULTIES {
                let mut r = rng(u64::from(n) * 31);
                for _ in 0..50 {
                    let p = generate_working_memory_problem(&mut r, n, band);
                    let (value, ops, operands) = evaluate(&p.prompt);
                    assert_eq!(ops, usize::from(n), "{}", p.prompt);
                    assert_eq!(operands, usize::from(n) + 1, "{}", p.prompt);
                    assert_eq!(value, p.answer, "{}", p.prompt);
                    assert!(p.answer >= 0);
                    assert!(!p.prompt.contains('÷'));
                }
            }
        }
    }

    #[test]
    fn test_working_memory_strips_outer_parens_only() {
        let mut r = rng(21);
        let p = generate_working_memory_problem(&mut r, 1, DifficultyId::Sparks.band());
        assert!(!p.prompt.starts_with('('));
        assert!(!p.prompt.ends_with(')'));
    }

    #[test]
    fn test_working_memory_op_count_is_clamped() {
        let mut r = rng(17);
        let p = generate_working_memory_problem(&mut r, 40, DifficultyId::Sparks.band());
        let (_, ops, _) = evaluate(&p.prompt);
        assert_eq!(ops, usize::from(MAX_WORKING_MEMORY_OPS));
    }
}
