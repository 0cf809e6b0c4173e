use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type,
};

/// Turn an async test into a synchronous one that runs against a scratch
/// database, injecting its dependencies and dropping the database again no
/// matter how the test terminates.
///
/// Injectable parameters are [`rocket::local::asynchronous::Client`],
/// [`mongodb::Database`], and any number of `Coll<T>` collection handles.
/// `#[backend_test(admin)]` and `#[backend_test(voter)]` additionally log the
/// client in as the example admin or the example voter before the test body
/// runs.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    let (test_args, coll_idents, coll_types) = match parse_params(&item_fn.sig) {
        Ok(params) => params,
        Err(err) => return err.into_compile_error().into(),
    };

    // The future keeps a mangled name so the test can keep the original one.
    let name = item_fn.sig.ident.clone();
    let fut_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = fut_name.clone();

    let login = match parse_macro_input!(args as Option<Ident>) {
        Some(role) if role == "admin" => admin_login(),
        Some(role) if role == "voter" => voter_login(),
        _ => TokenStream2::new(),
    };

    quote! {
        #[test]
        fn #name() {
            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Database) {
                let db_client = crate::db_client().await;
                let db_name = crate::database();
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_db(db_client.clone(), &db_name).await,
                )
                .await
                .unwrap();
                let db = db_client.database(&db_name);

                #login

                (rocket_client, db)
            }

            #item_fn

            async fn cleanup(db: mongodb::Database) {
                db.drop(None).await.unwrap();
            }

            // Separate runtimes for setup/cleanup and the test itself: the
            // test runtime is consumed inside `catch_unwind`, but the scratch
            // database must be dropped even if the test panics.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let test_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            let (rocket_client, db) = outer_runtime.block_on(setup());

            // Mutexes safely carry the `!UnwindSafe` handles across the boundary.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let db_mutex = std::sync::Mutex::new(db.clone());
            let runtime_mutex = std::sync::Mutex::new(test_runtime);
            let result = std::panic::catch_unwind(|| {
                let rocket_client = client_mutex.into_inner().unwrap();
                let db = db_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                #(
                    let #coll_idents =
                        crate::model::mongodb::Coll::<#coll_types>::from_db(&db);
                )*

                runtime.block_on(#fut_name(#(#test_args),* #(,#coll_idents)*));
            });

            outer_runtime.block_on(cleanup(db));

            if let Err(cause) = result {
                std::panic::panic_any(cause);
            }
        }
    }
    .into()
}

/// Log the test client in as the example admin.
fn admin_login() -> TokenStream2 {
    quote! {
        crate::model::mongodb::Coll::<crate::model::db::admin::NewAdmin>::from_db(&db)
            .insert_one(crate::model::db::admin::NewAdmin::example(), None)
            .await
            .unwrap();

        rocket_client
            .post(uri!(crate::api::auth::authenticate))
            .header(rocket::http::ContentType::JSON)
            .body(
                rocket::serde::json::json!(
                    crate::model::api::admin::AdminCredentials::example()
                )
                .to_string(),
            )
            .dispatch()
            .await;
    }
}

/// Register the example voter and walk them through the full OTP exchange.
fn voter_login() -> TokenStream2 {
    quote! {
        crate::model::mongodb::Coll::<crate::model::db::voter::NewVoter>::from_db(&db)
            .insert_one(crate::model::db::voter::NewVoter::example(), None)
            .await
            .unwrap();

        rocket_client
            .post(uri!(crate::api::auth::challenge))
            .header(rocket::http::ContentType::JSON)
            .body(
                rocket::serde::json::json!(
                    crate::model::api::auth::ChallengeRequest::example()
                )
                .to_string(),
            )
            .dispatch()
            .await;

        // The code never leaves the server in tests, so read it back from the
        // scratch database.
        let issued = crate::model::mongodb::Coll::<crate::model::db::otp::OtpRecord>::from_db(&db)
            .find_one(None, None)
            .await
            .unwrap()
            .unwrap();

        rocket_client
            .post(uri!(crate::api::auth::verify))
            .header(rocket::http::ContentType::JSON)
            .body(
                rocket::serde::json::json!(
                    crate::model::api::auth::VerifyRequest::example(issued.code)
                )
                .to_string(),
            )
            .dispatch()
            .await;
    }
}

/// Check the signature is async, then split its parameters into injected
/// dependencies (`Client`/`Database`) and collection handles (`Coll<T>`).
#[allow(clippy::type_complexity)]
fn parse_params(sig: &Signature) -> Result<(Vec<TokenStream2>, Vec<Ident>, Vec<Ident>), syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut args = vec![];
    let mut coll_idents = vec![];
    let mut coll_types = vec![];

    for input in &sig.inputs {
        let pat_type = match input {
            FnArg::Typed(pat_type) => pat_type,
            FnArg::Receiver(_) => {
                return Err(syn::Error::new(input.span(), "Test cannot take `self`"))
            }
        };
        let ident = match &*pat_type.pat {
            Pat::Ident(pat_ident) => pat_ident.ident.clone(),
            _ => {
                return Err(syn::Error::new(
                    pat_type.pat.span(),
                    "Parameter pattern must be a plain identifier",
                ))
            }
        };
        let type_path = match &*pat_type.ty {
            Type::Path(type_path) => type_path,
            _ => {
                return Err(syn::Error::new(
                    pat_type.ty.span(),
                    "Parameter type must be a path type",
                ))
            }
        };

        if let Some(type_ident) = type_path.path.get_ident() {
            if type_ident == "Client" {
                args.push(quote! { rocket_client });
                continue;
            } else if type_ident == "Database" {
                args.push(quote! { db });
                continue;
            }
        } else {
            // Valid as the last path segment for any type is itself.
            let last = type_path.path.segments.last().unwrap();
            if last.ident == "Coll" {
                if let PathArguments::AngleBracketed(generics) = &last.arguments {
                    if let Some(GenericArgument::Type(Type::Path(inner))) = generics.args.first() {
                        if let Some(inner_ident) = inner.path.get_ident() {
                            coll_idents.push(ident);
                            coll_types.push(inner_ident.clone());
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `ident: Client`, `ident: Database` or `ident: Coll<T>`",
        ));
    }

    Ok((args, coll_idents, coll_types))
}
