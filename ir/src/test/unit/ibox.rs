use crate::test::helpers::Grid;
use crate::{Error, Interval, IntervalBox, Schedule};

fn keep_order(_: &Interval) -> i64 {
    0
}

#[test]
fn test_intersection_keeps_callers_dimensions() {
    let grid = Grid::new();
    let narrow = IntervalBox::new([Interval::new(grid.x.clone(), 0, 2)]).unwrap();
    let wide = IntervalBox::new([Interval::new(grid.x.clone(), 1, 3), Interval::new(grid.y.clone(), 0, 0)]).unwrap();

    // Not symmetric: the caller's dimension set is the base.
    let lhs = narrow.intersection(&[&wide]);
    assert_eq!(lhs.len(), 1);
    assert_eq!(lhs.get(&grid.x), Some(&Interval::new(grid.x.clone(), 1, 2)));
    assert!(!lhs.contains(&grid.y));

    let rhs = wide.intersection(&[&narrow]);
    assert_eq!(rhs.len(), 2);
    assert_eq!(rhs.get(&grid.x), Some(&Interval::new(grid.x.clone(), 1, 2)));
    assert_eq!(rhs.get(&grid.y), Some(&Interval::new(grid.y.clone(), 0, 0)));
}

#[test]
fn test_intersection_of_nulls() {
    let grid = Grid::new();
    let a = IntervalBox::new([Interval::null(grid.x.clone())]).unwrap();
    let b = IntervalBox::new([Interval::null(grid.x.clone())]).unwrap();

    assert_eq!(a.intersection(&[&b]), a);
}

#[test]
fn test_duplicate_dimension_rejected() {
    let grid = Grid::new();
    let err = IntervalBox::new([Interval::new(grid.x.clone(), 0, 1), Interval::null(grid.x.clone())]).unwrap_err();
    assert!(matches!(err, Error::DuplicateDimension { .. }));
}

#[test]
fn test_equality_ignores_order() {
    let grid = Grid::new();
    let x = Interval::new(grid.x.clone(), 0, 1);
    let y = Interval::new(grid.y.clone(), -1, 0);

    let a = IntervalBox::new([x.clone(), y.clone()]).unwrap();
    let b = IntervalBox::new([y, x]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_subtract_treats_missing_as_null() {
    let grid = Grid::new();
    let a = IntervalBox::new([Interval::new(grid.x.clone(), 1, 2)]).unwrap();
    let b = IntervalBox::new([Interval::new(grid.x.clone(), 0, 1), Interval::new(grid.y.clone(), 1, 1)]).unwrap();

    let diff = a.subtract(&b).unwrap();
    assert_eq!(diff.get(&grid.x), Some(&Interval::new(grid.x.clone(), 1, 1)));
    assert_eq!(diff.get(&grid.y), Some(&Interval::new(grid.y.clone(), -1, -1)));
}

#[test]
fn test_union_appends_new_dimensions() {
    let grid = Grid::new();
    let a = IntervalBox::new([Interval::new(grid.x.clone(), 0, 0)]).unwrap();
    let b = IntervalBox::new([Interval::new(grid.x.clone(), 2, 3), Interval::null(grid.y.clone())]).unwrap();

    let union = a.union(&b).unwrap();
    assert_eq!(union.dimensions().cloned().collect::<Vec<_>>(), vec![grid.x.clone(), grid.y.clone()]);
    assert_eq!(union.get(&grid.x), Some(&Interval::new(grid.x.clone(), 0, 3)));
}

#[test]
fn test_schedule_puts_time_first() {
    let grid = Grid::new();
    let intervals = IntervalBox::new([
        Interval::new(grid.x.clone(), 0, 0),
        Interval::new(grid.time.clone(), 0, 1),
        Interval::null(grid.y.clone()),
    ])
    .unwrap();

    let schedule = Schedule::time_first(intervals);
    let dims: Vec<_> = schedule.dimensions().cloned().collect();
    assert_eq!(dims, vec![grid.time.clone(), grid.x.clone(), grid.y.clone()]);

    // Order survives algebra.
    let negated = schedule.negate();
    assert_eq!(negated.intervals()[0], Interval::new(grid.time.clone(), 0, -1));
}

#[test]
fn test_schedule_equality_is_ordered() {
    let grid = Grid::new();
    let x = Interval::new(grid.x.clone(), 0, 0);
    let y = Interval::new(grid.y.clone(), 0, 0);

    let a = Schedule::new(IntervalBox::new([x.clone(), y.clone()]).unwrap(), keep_order);
    let b = Schedule::new(IntervalBox::new([y, x]).unwrap(), keep_order);
    assert_eq!(a.as_box(), b.as_box());
    assert_ne!(a, b);
}

#[test]
fn test_display() {
    let grid = Grid::new();
    let b = IntervalBox::new([Interval::new(grid.x.clone(), -1, 1), Interval::null(grid.y.clone())]).unwrap();
    assert_eq!(b.to_string(), "Box[x[-1, 1], y[Null]]");
}
