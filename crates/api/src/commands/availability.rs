use secrely_domain::Weekday;

use crate::cli::AvailabilityArgs;

pub fn show(args: &AvailabilityArgs) {
    let week = args.week();
    for day in Weekday::ALL {
        let slots = week.slots(day);
        if slots.is_empty() {
            println!("{:<10} unavailable", day.name());
        } else {
            let windows: Vec<String> = slots.iter().map(ToString::to_string).collect();
            println!("{:<10} {}", day.name(), windows.join(", "));
        }
    }
    println!();
    println!("{}", week.serialize());
}
