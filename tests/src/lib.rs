//! End-to-end checks that wire fakes for the network into the real pipeline.

#[cfg(test)]
mod support;

#[cfg(test)]
mod cache;

#[cfg(test)]
mod discovery {
    mod integration;
}
