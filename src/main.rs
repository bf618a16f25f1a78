mod config;
mod identity;
mod library;
mod runtime;
mod tags;

#[cfg(test)]
mod test_support;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
