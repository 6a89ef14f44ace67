use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::tools::{AgentTool, ToolSpec};

pub const GROWTH_TOOL: &str = "calculate_investment_growth";

/// Future value under annual compounding, formatted as currency.
pub fn calculate_investment_growth(principal: f64, rate_decimal: f64, years: u32) -> String {
    let amount = principal * (1.0 + rate_decimal).powf(years as f64);
    format_currency(amount)
}

/// `$` followed by the amount with thousands separators and two decimals.
/// Negative amounts keep their sign after the dollar sign: `$-1,234.50`.
pub fn format_currency(amount: f64) -> String {
    if amount.is_nan() {
        return "$nan".to_string();
    }
    if amount.is_infinite() {
        return if amount > 0.0 { "$inf" } else { "$-inf" }.to_string();
    }

    let fixed = format!("{:.2}", amount);
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, cents) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("${}{}.{}", sign, grouped, cents)
}

#[derive(Debug, Deserialize)]
struct GrowthArgs {
    principal: f64,
    rate_decimal: f64,
    years: u32,
}

pub struct GrowthCalculatorTool;

#[async_trait]
impl AgentTool for GrowthCalculatorTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: GROWTH_TOOL.to_string(),
            description: "Calculates the future value of an investment using compound interest.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "principal": {
                        "type": "number",
                        "description": "The starting amount (e.g., 10000)"
                    },
                    "rate_decimal": {
                        "type": "number",
                        "description": "The annual return rate as a decimal (e.g., 0.07 for 7%)"
                    },
                    "years": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Number of years to grow"
                    }
                },
                "required": ["principal", "rate_decimal", "years"]
            }),
        }
    }

    async fn call(&self, arguments: &str) -> Result<String> {
        let args: GrowthArgs = serde_json::from_str(arguments)?;
        Ok(calculate_investment_growth(args.principal, args.rate_decimal, args.years))
    }
}
