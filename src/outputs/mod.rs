//! Render sinks for the presenter.
//!
//! # Submodules
//!
//! - [`html`]: HTML fragment with one `<article>` per post, or the fallback panel
//! - [`json`]: JSON document for machine consumers
//!
//! # Output Shapes
//!
//! ```text
//! html: <section class="channel-feed"> <article class="post">…</article>… </section>
//!       <section class="channel-fallback">…</section>
//! json: {"status":"ok","posts":[…]}
//!       {"status":"fallback","channel_url":"…"}
//! ```

pub mod html;
pub mod json;
