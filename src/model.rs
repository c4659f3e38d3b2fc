pub mod posenc;
