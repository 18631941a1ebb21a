use nanotick::time::format::format_timestamp;
use nanotick::time::literal::scan_quoted_literals;
use nanotick::time::parse::parse_timestamp;
use nanotick::time::period::{minus_period, plus_period};
use nanotick::time::{detect_literal, DateStyle, TimeLiteral, HOUR};
use nanotick::{Period, TimeZone};

#[test]
fn rendered_literals_detect_back_to_the_same_value() {
    for text in [
        "2013-01-15T09:30:00.000 NY",
        "2013-01-15",
        "1WT1H",
        "1Y2M",
        "L09:30:05.5",
        "-2T03:00:00",
    ] {
        let literal = detect_literal(text).expect("literal");
        let rendered = literal.render(TimeZone::NY);
        let again = detect_literal(&rendered).expect("rendered literal");
        assert_eq!(again, literal, "{text} rendered as {rendered}");
    }
}

#[test]
fn new_york_open_formats_in_other_zones() {
    let open = parse_timestamp("2013-01-15T09:30:00.000 NY").expect("parse");
    assert_eq!(format_timestamp(open, TimeZone::NY), "2013-01-15T09:30:00.000 NY");
    assert_eq!(format_timestamp(open, TimeZone::UTC), "2013-01-15T14:30:00.000 UTC");
    assert_eq!(
        parse_timestamp(&format_timestamp(open, TimeZone::LON)).expect("reparse"),
        open
    );
}

#[test]
fn expression_scan_reports_each_quoted_span() {
    let expression = "Ts >= '2013-01-15T09:30 NY' && Ts < '2013-01-15T16:00 NY' + 'T1H' && c == 'x' && s == 'abc'";
    let found = scan_quoted_literals(expression, DateStyle::default());
    assert_eq!(found.len(), 4);

    assert!(matches!(found[0].literal, Some(TimeLiteral::Timestamp(_))));
    assert_eq!(&expression[found[0].span.clone()], "2013-01-15T09:30 NY");
    assert!(matches!(found[1].literal, Some(TimeLiteral::Timestamp(_))));
    assert_eq!(found[2].literal, Some(TimeLiteral::Nanos(HOUR)));
    assert_eq!(found[3].literal, None);
}

#[test]
fn week_and_hour_period_across_spring_forward() {
    let period: Period = "1WT1H".parse().expect("period");
    let fixed = period.to_standard_nanos().expect("no overflow");
    assert_eq!(fixed, Some(169 * HOUR));

    // The week spans the 2013-03-10 change, so local calendar math is one hour short.
    let start = parse_timestamp("2013-03-05T12:00:00 NY").expect("parse");
    let end = plus_period(Some(start), &period, TimeZone::NY)
        .expect("shift")
        .expect("non-null");
    assert_eq!(end.nanos() - start.nanos(), 168 * HOUR);
    assert_eq!(format_timestamp(end, TimeZone::NY), "2013-03-12T13:00:00.000 NY");

    let back = minus_period(Some(end), &period, TimeZone::NY)
        .expect("shift")
        .expect("non-null");
    assert_eq!(back, start);
}
