pub mod economic_times;
pub mod livemint;
pub mod moneycontrol;
