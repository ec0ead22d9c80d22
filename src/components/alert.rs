use std::time::Duration;

use leptos::prelude::*;

/// Error banner that clears itself after `timeout_ms`.
#[component]
pub fn Alert(message: RwSignal<Option<String>>, timeout_ms: u32) -> impl IntoView {
	Effect::new(move |_| {
		let Some(shown) = message.get() else {
			return;
		};
		log::error!("{shown}");
		set_timeout(
			move || {
				// a newer alert keeps its own timer
				let _ = message.try_update(|current| {
					if current.as_deref() == Some(shown.as_str()) {
						*current = None;
					}
				});
			},
			Duration::from_millis(u64::from(timeout_ms)),
		);
	});

	view! {
		<Show when=move || message.with(Option::is_some)>
			<div class="alert alert-danger" role="alert">
				{move || message.get().unwrap_or_default()}
				<button class="alert-close" on:click=move |_| message.set(None)>
					"×"
				</button>
			</div>
		</Show>
	}
}
