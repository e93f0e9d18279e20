//! End-to-end tests assembled from instruction lists rather than raw bytes
//! (see [`asm`]), exercising several ops together instead of in isolation.

mod asm;
