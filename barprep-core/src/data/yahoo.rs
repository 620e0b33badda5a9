//! Yahoo Finance data provider.
//!
//! Fetches OHLCV bars from Yahoo's v8 chart API at the requested interval and
//! hands them back shaped like a field/ticker two-level table, with the bar
//! timestamps as the row index.
//!
//! One HTTP request per call, no retries. "No data" answers from Yahoo (unknown
//! symbol, range outside the interval's lookback window) come back as an empty
//! response so the fetcher can reject them uniformly.

use super::provider::{DataError, DataProvider, RawColumn, RawResponse, RowIndex};
use super::request::BarSize;
use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;
use serde::Deserialize;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Error codes/descriptions Yahoo uses when there is simply nothing to return.
const NO_DATA_MARKERS: &[&str] = &[
    "not found",
    "no data found",
    "data not available",
    "data doesn't exist",
    "unprocessable entity",
];

fn is_no_data(err: &ChartError) -> bool {
    let text = format!("{} {}", err.code, err.description).to_lowercase();
    NO_DATA_MARKERS.iter().any(|m| text.contains(m))
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Build the chart API URL. `end` is exclusive.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate, bar_size: BarSize) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval={bar_size}\
             &includeAdjustedClose=true&events=div%2Csplit"
        )
    }

    /// Parse the chart API response into a two-level (field, ticker) table.
    fn parse_response(
        symbol: &str,
        bar_size: BarSize,
        resp: ChartResponse,
    ) -> Result<RawResponse, DataError> {
        let result = match resp.chart.result {
            Some(result) => result,
            None => {
                return match resp.chart.error {
                    Some(err) if is_no_data(&err) => Ok(RawResponse::empty()),
                    Some(err) => Err(DataError::Provider(format!(
                        "{}: {}",
                        err.code, err.description
                    ))),
                    None => Err(DataError::ResponseFormatChanged(
                        "empty result with no error".into(),
                    )),
                }
            }
        };

        let Some(data) = result.into_iter().next() else {
            return Ok(RawResponse::empty());
        };
        // A range without trading sessions comes back without timestamps.
        let Some(timestamps) = data.timestamp else {
            return Ok(RawResponse::empty());
        };

        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let n = timestamps.len();
        let mut index = Vec::with_capacity(n);
        let mut open = Vec::with_capacity(n);
        let mut high = Vec::with_capacity(n);
        let mut low = Vec::with_capacity(n);
        let mut close = Vec::with_capacity(n);
        let mut adj_close = Vec::with_capacity(n);
        let mut volume = Vec::with_capacity(n);

        for (i, &ts) in timestamps.iter().enumerate() {
            let when = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let o = quote.open.get(i).copied().flatten();
            let h = quote.high.get(i).copied().flatten();
            let l = quote.low.get(i).copied().flatten();
            let c = quote.close.get(i).copied().flatten();
            let v = quote.volume.get(i).copied().flatten();

            // Skip rows where all OHLCV are None (holidays, halted sessions)
            if o.is_none() && h.is_none() && l.is_none() && c.is_none() && v.is_none() {
                continue;
            }

            index.push(when);
            open.push(o);
            high.push(h);
            low.push(l);
            close.push(c);
            volume.push(v);
            adj_close.push(
                adj_closes
                    .as_ref()
                    .and_then(|v| v.get(i).copied().flatten())
                    .or(c),
            );
        }

        let index_name = if bar_size.is_intraday() { "Datetime" } else { "Date" };
        let column = |field: &str, values: Series| RawColumn::multi(&[field, symbol], values);

        Ok(RawResponse {
            index: Some(RowIndex {
                name: index_name.to_string(),
                values: index,
            }),
            columns: vec![
                column("Adj Close", Series::new("Adj Close".into(), adj_close)),
                column("Close", Series::new("Close".into(), close)),
                column("High", Series::new("High".into(), high)),
                column("Low", Series::new("Low".into(), low)),
                column("Open", Series::new("Open".into(), open)),
                column("Volume", Series::new("Volume".into(), volume)),
            ],
        })
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        bar_size: BarSize,
    ) -> Result<RawResponse, DataError> {
        let url = Self::chart_url(symbol, start, end, bar_size);

        let resp = self.client.get(&url).send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                DataError::NetworkUnreachable(e.to_string())
            } else {
                DataError::Provider(e.to_string())
            }
        })?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(format!("reading body for {symbol}: {e}")))?;

        // Yahoo reports "no data" as 4xx with a regular chart error body.
        match serde_json::from_str::<ChartResponse>(&body) {
            Ok(chart) => Self::parse_response(symbol, bar_size, chart),
            Err(_) if !status.is_success() => {
                Err(DataError::Provider(format!("HTTP {status} for {symbol}")))
            }
            Err(e) => Err(DataError::ResponseFormatChanged(format!(
                "failed to parse response for {symbol}: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str, bar_size: BarSize) -> Result<RawResponse, DataError> {
        let chart: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("AAPL", bar_size, chart)
    }

    #[test]
    fn url_carries_interval_and_exclusive_end() {
        let url = YahooProvider::chart_url(
            "AAPL",
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            BarSize::TwoMinutes,
        );
        assert!(url.contains("/chart/AAPL?"));
        assert!(url.contains("period1=1577836800"));
        assert!(url.contains("period2=1577923200"));
        assert!(url.contains("interval=2m"));
    }

    #[test]
    fn parses_two_level_table_and_skips_empty_rows() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1577975400,1578061800,1578148200],
            "indicators":{
                "quote":[{"open":[74.06,null,74.29],"high":[75.15,null,75.14],
                          "low":[73.8,null,74.13],"close":[75.09,null,74.36],
                          "volume":[135480400,null,146322800]}],
                "adjclose":[{"adjclose":[73.06,null,72.35]}]}}],"error":null}}"#;

        let raw = parse(json, BarSize::OneDay).unwrap();
        assert_eq!(raw.height(), 2);
        assert!(raw.is_multi_level());
        assert_eq!(raw.index.as_ref().unwrap().name, "Date");
        assert_eq!(raw.columns[1].header, ["Close", "AAPL"]);
    }

    #[test]
    fn not_found_is_an_empty_response() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(parse(json, BarSize::OneDay).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_intraday_is_an_empty_response() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Unprocessable Entity","description":"1m data not available for startTime=1 and endTime=2. Only 8 days worth of 1m granularity data are allowed to be fetched per request."}}}"#;
        assert!(parse(json, BarSize::OneMinute).unwrap().is_empty());
    }

    #[test]
    fn other_chart_errors_are_provider_failures() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Internal Server Error","description":"boom"}}}"#;
        assert!(matches!(
            parse(json, BarSize::OneDay),
            Err(DataError::Provider(_))
        ));
    }

    #[test]
    fn missing_timestamps_is_empty() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse(json, BarSize::OneDay).unwrap().is_empty());
    }
}
