use tracing::debug;

pub const BASE_TAX_INCOME: i64 = 300;
pub const TAX_PER_HAPPY_RESIDENT: f64 = 100.0;

/// City balance. Unclamped: only purchase validation looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ledger {
    money: i64,
}

impl Ledger {
    pub fn new(money: i64) -> Self {
        Self { money }
    }

    pub fn money(&self) -> i64 {
        self.money
    }

    pub fn can_afford(&self, cost: i64) -> bool {
        cost <= self.money
    }

    pub fn debit(&mut self, cost: i64) {
        self.money -= cost;
    }

    pub fn credit(&mut self, amount: i64) {
        self.money += amount;
    }

    /// `population * happiness * 100 + 300`, truncated toward zero.
    pub fn collect_taxes(&mut self, population: i64, happiness: f64) -> i64 {
        let income = (population as f64 * happiness * TAX_PER_HAPPY_RESIDENT) as i64
            + BASE_TAX_INCOME;
        self.money += income;
        debug!(population, happiness, income, balance = self.money, "collected taxes");
        income
    }
}
